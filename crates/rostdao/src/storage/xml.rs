//! Tree-document storage.
//!
//! The root element holds one child per record, named after the record
//! type in lower camel case. Fields are child elements or attributes of
//! that child depending on the [`Layout`]. Other children of the root are
//! left as they are.
//!
//! The parsed document is the DAO's handle: reads use it directly, and
//! each mutation works on a copy that replaces it only once the file has
//! been written.

use crate::config::{DaoConfig, Layout, XmlConfig};
use crate::error::{DaoError, DaoResult};
use crate::record::Record;
use crate::schema::RecordSchema;
use crate::storage::file::TextFile;
use crate::storage::rows::{Row, RowTable};
use crate::storage::text::{TextDao, TextFormat};
use std::path::Path;
use xmltree::{Element, EmitterConfig, XMLNode};

/// A DAO over a document file.
pub type XmlDao<R> = TextDao<R, XmlFormat>;

/// Record elements of a document, with their fields as rows in
/// declaration order.
#[derive(Debug, Clone)]
pub struct XmlTable {
    document: Element,
    tag: String,
    layout: Layout,
    columns: Vec<&'static str>,
    positions: Vec<usize>,
    rows: Vec<Row>,
}

impl XmlTable {
    fn record_element(&self, row: &Row) -> Element {
        let mut element = Element::new(&self.tag);
        for (name, cell) in self.columns.iter().zip(row) {
            match self.layout {
                Layout::Tag => element.children.push(XMLNode::Element(field_element(name, cell))),
                Layout::Attribute => {
                    element.attributes.insert((*name).to_owned(), cell.clone());
                }
            }
        }
        element
    }
}

fn field_element(name: &str, text: &str) -> Element {
    let mut child = Element::new(name);
    if !text.is_empty() {
        child.children.push(XMLNode::Text(text.to_owned()));
    }
    child
}

impl RowTable for XmlTable {
    fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    fn rows(&self) -> &[Row] {
        &self.rows
    }

    fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    fn push_row(&mut self, row: Row) {
        let element = self.record_element(&row);
        self.document.children.push(XMLNode::Element(element));
        self.positions.push(self.document.children.len() - 1);
        self.rows.push(row);
    }

    fn remove_row(&mut self, index: usize) {
        let position = self.positions.remove(index);
        self.document.children.remove(position);
        for p in &mut self.positions {
            if *p > position {
                *p -= 1;
            }
        }
        self.rows.remove(index);
    }

    fn replace_row(&mut self, index: usize, row: Row) {
        let layout = self.layout;
        let node = self.document.children.get_mut(self.positions[index]);
        if let Some(XMLNode::Element(element)) = node {
            for (col, name) in self.columns.iter().enumerate() {
                if self.rows[index][col] == row[col] {
                    continue;
                }
                match layout {
                    Layout::Tag => match element.get_mut_child(*name) {
                        Some(child) => {
                            child
                                .children
                                .retain(|n| !matches!(n, XMLNode::Text(_) | XMLNode::CData(_)));
                            if !row[col].is_empty() {
                                child.children.push(XMLNode::Text(row[col].clone()));
                            }
                        }
                        None => element
                            .children
                            .push(XMLNode::Element(field_element(name, &row[col]))),
                    },
                    Layout::Attribute => {
                        element.attributes.insert((*name).to_owned(), row[col].clone());
                    }
                }
            }
        }
        self.rows[index] = row;
    }
}

/// Document file format.
#[derive(Debug, Clone)]
pub struct XmlFormat {
    file: TextFile,
    document: Element,
    layout: Layout,
    indent: String,
}

impl XmlFormat {
    /// Returns the path of the file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Returns the current document.
    pub fn document(&self) -> &Element {
        &self.document
    }

    /// Returns the field layout.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    fn render(document: &Element, indent: &str) -> DaoResult<String> {
        let mut buf = Vec::new();
        let config = EmitterConfig::new()
            .perform_indent(true)
            .indent_string(indent.to_owned());
        document.write_with_config(&mut buf, config)?;
        let mut text = String::from_utf8(buf)
            .map_err(|e| DaoError::malformed_document(e.to_string()))?;
        if !text.ends_with('\n') {
            text.push('\n');
        }
        Ok(text)
    }

    fn read_cell(&self, element: &Element, name: &str, index: usize) -> DaoResult<String> {
        let missing = || {
            DaoError::malformed_document(format!(
                "record {index} <{}> has no {name} field",
                element.name
            ))
        };
        match self.layout {
            Layout::Tag => {
                let child = element.get_child(name).ok_or_else(missing)?;
                Ok(child
                    .get_text()
                    .map(|t| t.trim().to_owned())
                    .unwrap_or_default())
            }
            Layout::Attribute => element.attributes.get(name).cloned().ok_or_else(missing),
        }
    }
}

impl TextFormat for XmlFormat {
    type Table = XmlTable;

    fn load<R: Record>(&self, schema: &RecordSchema<R>) -> DaoResult<XmlTable> {
        let columns = schema.field_names();
        let mut positions = Vec::new();
        let mut rows = Vec::new();
        for (position, node) in self.document.children.iter().enumerate() {
            let XMLNode::Element(element) = node else {
                continue;
            };
            if element.name != schema.tag_name() {
                continue;
            }
            let row = columns
                .iter()
                .map(|name| self.read_cell(element, name, rows.len()))
                .collect::<DaoResult<Row>>()?;
            positions.push(position);
            rows.push(row);
        }
        Ok(XmlTable {
            document: self.document.clone(),
            tag: schema.tag_name().to_owned(),
            layout: self.layout,
            columns,
            positions,
            rows,
        })
    }

    fn store<R: Record>(&mut self, _schema: &RecordSchema<R>, table: XmlTable) -> DaoResult<()> {
        let text = Self::render(&table.document, &self.indent)?;
        self.file.replace(&text)?;
        self.document = table.document;
        Ok(())
    }
}

impl<R: Record> TextDao<R, XmlFormat> {
    /// Opens a DAO over a document file.
    ///
    /// A missing or empty file gets an empty root element when
    /// `create_if_missing` is set.
    ///
    /// # Errors
    ///
    /// Fails with [`DaoError::XmlParse`] if the file is not a document and
    /// with [`DaoError::MalformedDocument`] if a record element lacks a
    /// field.
    pub fn new(path: &Path, config: &DaoConfig, xml: &XmlConfig) -> DaoResult<Self> {
        let schema = RecordSchema::resolve(config)?;
        let file = if xml.create_if_missing {
            TextFile::open_or_create(path, xml.write_mode)?
        } else {
            TextFile::open(path, xml.write_mode)?
        };

        let text = file.read_to_string()?;
        let document = if text.trim().is_empty() {
            if !xml.create_if_missing {
                return Err(DaoError::malformed_document("empty document"));
            }
            let root_name = xml
                .root_name
                .clone()
                .unwrap_or_else(|| format!("{}List", schema.tag_name()));
            let root = Element::new(&root_name);
            file.replace(&XmlFormat::render(&root, &xml.indent)?)?;
            root
        } else {
            Element::parse(text.as_bytes())?
        };
        let format = XmlFormat {
            file,
            document,
            layout: xml.layout,
            indent: xml.indent.clone(),
        };

        let table = format.load(&schema)?;
        tracing::debug!(
            path = %path.display(),
            type_name = R::TYPE_NAME,
            records = table.rows.len(),
            layout = ?xml.layout,
            "opened document file"
        );
        Ok(Self::from_parts(schema, format))
    }
}
