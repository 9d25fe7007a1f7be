//! DAO configuration.

use serde::{Deserialize, Serialize};

/// Configuration shared by every DAO.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaoConfig {
    /// Name of the identifier property, if records have one.
    pub identifier: Option<String>,
}

impl DaoConfig {
    /// Creates a configuration without an identifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the identifier property.
    #[must_use]
    pub fn identifier(mut self, name: impl Into<String>) -> Self {
        self.identifier = Some(name.into());
        self
    }
}

/// How whole-file rewrites reach the disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Truncate and rewrite the file. A crash mid-write can lose data.
    InPlace,
    /// Write a sibling temporary file, then rename it over the target.
    #[default]
    AtomicRename,
}

/// Configuration for delimited-text files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    /// Cell separator.
    pub separator: char,
    /// Whether to create the file with a header if it is missing or empty.
    pub create_if_missing: bool,
    /// How rewrites reach the disk.
    pub write_mode: WriteMode,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            separator: ',',
            create_if_missing: true,
            write_mode: WriteMode::AtomicRename,
        }
    }
}

impl CsvConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cell separator.
    #[must_use]
    pub const fn separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Sets whether to create a missing file.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the write mode.
    #[must_use]
    pub const fn write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }
}

/// Where record fields live inside a document element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// One child element per field, holding the value as text.
    #[default]
    Tag,
    /// One attribute per field.
    Attribute,
}

/// Configuration for document files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlConfig {
    /// Field layout inside record elements.
    pub layout: Layout,
    /// Root element name for new documents. Defaults to `<tag>List`.
    pub root_name: Option<String>,
    /// Whether to create an empty document if the file is missing or empty.
    pub create_if_missing: bool,
    /// How rewrites reach the disk.
    pub write_mode: WriteMode,
    /// Indentation unit of written documents.
    pub indent: String,
}

impl Default for XmlConfig {
    fn default() -> Self {
        Self {
            layout: Layout::Tag,
            root_name: None,
            create_if_missing: true,
            write_mode: WriteMode::AtomicRename,
            indent: "    ".to_owned(),
        }
    }
}

impl XmlConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the field layout.
    #[must_use]
    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Sets the root element name used for new documents.
    #[must_use]
    pub fn root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = Some(name.into());
        self
    }

    /// Sets whether to create a missing file.
    #[must_use]
    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the write mode.
    #[must_use]
    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    /// Sets the indentation unit.
    #[must_use]
    pub fn indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }
}
