//! Map annotations
//!
//! Line oriented, comma separated annotation records:
//!
//! ```text
//! text, x, y, label
//! arrow, x1, y1, x2, y2
//! annotation, x1, y1, x2, y2, label
//! ellipse, x, y, major_axis, minor_axis, position_angle
//! ```
//! Coordinates are sky offsets [mas] and angles are in degrees.
//! Records with any other tag are ignored.

use std::{io::Read, ops::Deref, str::FromStr};

#[derive(thiserror::Error, Debug)]
pub enum AnnotationError {
    #[error("failed to read the annotation records")]
    Csv(#[from] csv::Error),
    #[error("line {line}: `{tag}` expects {expected} fields, found {found}")]
    Fields {
        line: u64,
        tag: String,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid number {value:?}")]
    Number {
        line: u64,
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },
}
type Result<T> = std::result::Result<T, AnnotationError>;

/// Annotation record
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// text at `(x, y)`
    Text { x: f32, y: f32, label: String },
    /// arrow pointing at `(x1, y1)` from `(x2, y2)`
    Arrow { x1: f32, y1: f32, x2: f32, y2: f32 },
    /// arrow pointing at `(x1, y1)` with the label at `(x2, y2)`
    Callout {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        label: String,
    },
    /// outline ellipse centered on `(x, y)`
    Ellipse {
        x: f32,
        y: f32,
        major_axis: f32,
        minor_axis: f32,
        position_angle: f32,
    },
}

struct Fields<'a> {
    line: u64,
    tag: &'a str,
    values: Vec<&'a str>,
}
impl<'a> Fields<'a> {
    fn expect(&self, expected: usize) -> Result<()> {
        if self.values.len() == expected {
            Ok(())
        } else {
            Err(AnnotationError::Fields {
                line: self.line,
                tag: self.tag.to_string(),
                expected,
                found: self.values.len(),
            })
        }
    }
    fn number(&self, i: usize) -> Result<f32> {
        let value = self.values[i];
        value.parse::<f32>().map_err(|source| AnnotationError::Number {
            line: self.line,
            value: value.to_string(),
            source,
        })
    }
    fn into_annotation(self) -> Result<Option<Annotation>> {
        let annotation = match self.tag {
            "text" => {
                self.expect(3)?;
                Annotation::Text {
                    x: self.number(0)?,
                    y: self.number(1)?,
                    label: self.values[2].to_string(),
                }
            }
            "arrow" => {
                self.expect(4)?;
                Annotation::Arrow {
                    x1: self.number(0)?,
                    y1: self.number(1)?,
                    x2: self.number(2)?,
                    y2: self.number(3)?,
                }
            }
            "annotation" => {
                self.expect(5)?;
                Annotation::Callout {
                    x1: self.number(0)?,
                    y1: self.number(1)?,
                    x2: self.number(2)?,
                    y2: self.number(3)?,
                    label: self.values[4].to_string(),
                }
            }
            "ellipse" => {
                self.expect(5)?;
                Annotation::Ellipse {
                    x: self.number(0)?,
                    y: self.number(1)?,
                    major_axis: self.number(2)?,
                    minor_axis: self.number(3)?,
                    position_angle: self.number(4)?,
                }
            }
            tag => {
                log::debug!("line {}: ignoring `{}` annotation", self.line, tag);
                return Ok(None);
            }
        };
        Ok(Some(annotation))
    }
}

/// Annotation records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations(Vec<Annotation>);
impl Deref for Annotations {
    type Target = Vec<Annotation>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl From<Vec<Annotation>> for Annotations {
    fn from(value: Vec<Annotation>) -> Self {
        Self(value)
    }
}
impl Annotations {
    /// Reads annotation records
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut annotations = vec![];
        for result in rdr.records() {
            let record = result?;
            let line = record.position().map_or(0, |p| p.line());
            let mut fields = record.iter();
            let Some(tag) = fields.next() else {
                continue;
            };
            let fields = Fields {
                line,
                tag,
                values: fields.collect(),
            };
            if let Some(annotation) = fields.into_annotation()? {
                annotations.push(annotation);
            }
        }
        Ok(Self(annotations))
    }
}
impl FromStr for Annotations {
    type Err = AnnotationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_reader(s.as_bytes())
    }
}
