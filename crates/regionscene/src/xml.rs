//! Small helpers over `quick-xml` for the object persistence format.
//!
//! Documents are read into an [`XmlNode`] tree and written through
//! [`XmlOut`], which knows the vector, rotation and UUID element shapes the
//! format uses.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use glam::{Quat, Vec3};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use uuid::Uuid;

use crate::error::{Error, Result};

/// An element with its text content and child elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// Parse a document and return its root element.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlNode> = Vec::new();
        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(XmlNode {
                    name: element_name(&start)?,
                    ..XmlNode::default()
                }),
                Event::Empty(start) => {
                    let node = XmlNode {
                        name: element_name(&start)?,
                        ..XmlNode::default()
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => return Ok(node),
                    }
                }
                Event::Text(text) => {
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::End(_) => {
                    let Some(node) = stack.pop() else {
                        return Err(malformed("unbalanced end tag"));
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => return Ok(node),
                    }
                }
                Event::Eof => return Err(malformed("document has no root element")),
                _ => {}
            }
        }
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn text_as<T: std::str::FromStr>(&self, context: &'static str) -> Result<T> {
        self.text.trim().parse().map_err(|_| Error::Xml {
            context,
            message: format!("cannot parse {:?} in <{}>", self.text, self.name),
        })
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self.text.trim() {
            "true" | "True" | "1" => Ok(true),
            "false" | "False" | "0" | "" => Ok(false),
            other => Err(Error::Xml {
                context: "boolean",
                message: format!("cannot parse {other:?} in <{}>", self.name),
            }),
        }
    }

    /// A UUID either as direct text or wrapped in `<UUID>`/`<Guid>`.
    pub fn as_uuid(&self) -> Result<Uuid> {
        let text = self
            .child("UUID")
            .or_else(|| self.child("Guid"))
            .map_or(self.text.as_str(), |c| c.text.as_str())
            .trim();
        if text.is_empty() {
            return Ok(Uuid::nil());
        }
        Uuid::parse_str(text).map_err(|e| Error::Xml {
            context: "uuid",
            message: format!("<{}>: {e}", self.name),
        })
    }

    pub fn as_vec3(&self) -> Result<Vec3> {
        Ok(Vec3::new(
            self.component("X")?,
            self.component("Y")?,
            self.component("Z")?,
        ))
    }

    pub fn as_quat(&self) -> Result<Quat> {
        Ok(Quat::from_xyzw(
            self.component("X")?,
            self.component("Y")?,
            self.component("Z")?,
            self.component("W")?,
        ))
    }

    pub fn as_base64(&self) -> Result<Vec<u8>> {
        STANDARD.decode(self.text.trim()).map_err(|e| Error::Xml {
            context: "base64",
            message: format!("<{}>: {e}", self.name),
        })
    }

    fn component(&self, name: &str) -> Result<f32> {
        self.child(name)
            .map_or(Ok(0.0), |c| c.text_as::<f32>("vector component"))
    }
}

fn element_name(start: &BytesStart<'_>) -> Result<String> {
    std::str::from_utf8(start.local_name().as_ref())
        .map(str::to_owned)
        .map_err(|e| malformed(&e.to_string()))
}

fn malformed(message: &str) -> Error {
    Error::Xml {
        context: "document",
        message: message.to_owned(),
    }
}

/// Element writer for the persistence format.
pub struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl Default for XmlOut {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlOut {
    #[must_use]
    pub fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(|e| Error::Xml {
            context: "writer",
            message: e.to_string(),
        })
    }

    pub fn start(&mut self, name: &str) -> Result<()> {
        self.event(Event::Start(BytesStart::new(name)))
    }

    pub fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    pub fn text(&mut self, name: &str, value: &str) -> Result<()> {
        self.start(name)?;
        self.event(Event::Text(BytesText::new(value)))?;
        self.end(name)
    }

    pub fn display(&mut self, name: &str, value: impl std::fmt::Display) -> Result<()> {
        self.text(name, &value.to_string())
    }

    pub fn bool(&mut self, name: &str, value: bool) -> Result<()> {
        self.text(name, if value { "true" } else { "false" })
    }

    /// `<name><UUID>…</UUID></name>`
    pub fn uuid(&mut self, name: &str, value: Uuid) -> Result<()> {
        self.start(name)?;
        self.display("UUID", value)?;
        self.end(name)
    }

    pub fn vec3(&mut self, name: &str, value: Vec3) -> Result<()> {
        self.start(name)?;
        self.display("X", value.x)?;
        self.display("Y", value.y)?;
        self.display("Z", value.z)?;
        self.end(name)
    }

    pub fn quat(&mut self, name: &str, value: Quat) -> Result<()> {
        self.start(name)?;
        self.display("X", value.x)?;
        self.display("Y", value.y)?;
        self.display("Z", value.z)?;
        self.display("W", value.w)?;
        self.end(name)
    }

    pub fn base64(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.text(name, &STANDARD.encode(data))
    }

    pub fn finish(self) -> Result<String> {
        String::from_utf8(self.writer.into_inner()).map_err(|e| Error::Xml {
            context: "writer",
            message: e.to_string(),
        })
    }
}
