use std::collections::btree_map::{self, BTreeMap};

use log::{debug, warn};

use super::byte_cursor::{ByteCursor, CursorResult};
use crate::paths::get_path_to_font;

/// Everything a fnt_def command says about a font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontDefinition {
    pub font_num: u32,
    pub checksum: u32,
    pub scale: u32,
    pub design_size: u32,
    /// The area (directory) and name concatenated, e.g. "cmr10".
    pub font_name: String,
    placeholder: bool,
}

impl FontDefinition {
    pub fn new(
        font_num: u32,
        checksum: u32,
        scale: u32,
        design_size: u32,
        font_name: String,
    ) -> Self {
        FontDefinition {
            font_num,
            checksum,
            scale,
            design_size,
            font_name,
            placeholder: false,
        }
    }

    /// Stands in for a font that a page selects without ever defining it.
    pub fn placeholder(font_num: u32) -> Self {
        FontDefinition {
            font_num,
            checksum: 0,
            scale: 0,
            design_size: 0,
            font_name: String::new(),
            placeholder: true,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// According to section A.4 of the DVI driver standard, the font shall
    /// be enlarged by this factor before it is used.
    pub fn enlargement(&self, magnification: u32) -> f64 {
        if self.design_size == 0 {
            return 1.0;
        }
        (self.scale as f64 * magnification as f64)
            / (self.design_size as f64 * 1000.0)
    }
}

/// What happened when a definition was offered to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Inserted,
    /// Same number and checksum as a known font.
    Duplicate,
    /// Same number as a known font but another checksum; the first
    /// definition is kept.
    Conflict,
}

/// Maps DVI font numbers to their definitions. Pages refer to fonts by
/// number only, so lookups go through here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontRegistry {
    fonts: BTreeMap<u32, FontDefinition>,
}

impl FontRegistry {
    pub fn new() -> Self {
        FontRegistry {
            fonts: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, definition: FontDefinition) -> Registration {
        match self.fonts.entry(definition.font_num) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(definition);
                Registration::Inserted
            }
            btree_map::Entry::Occupied(mut entry) => {
                if entry.get().is_placeholder() {
                    entry.insert(definition);
                    return Registration::Inserted;
                }
                let known = entry.get();
                if known.checksum == definition.checksum {
                    Registration::Duplicate
                } else {
                    warn!(
                        "font {} redefined as {} (checksum {:#x}), \
                         keeping {} (checksum {:#x})",
                        definition.font_num,
                        definition.font_name,
                        definition.checksum,
                        known.font_name,
                        known.checksum
                    );
                    Registration::Conflict
                }
            }
        }
    }

    /// Makes sure some definition exists for a font number a page selects.
    /// Returns true if a placeholder had to be made up.
    pub fn ensure_defined(&mut self, font_num: u32) -> bool {
        if self.fonts.contains_key(&font_num) {
            return false;
        }
        warn!("font {} is used but never defined", font_num);
        self.fonts
            .insert(font_num, FontDefinition::placeholder(font_num));
        true
    }

    pub fn get(&self, font_num: u32) -> Option<&FontDefinition> {
        self.fonts.get(&font_num)
    }

    /// Finds the metrics file for a font through kpathsea. Placeholders and
    /// fonts that kpathsea doesn't know about are unresolved.
    pub fn resolve(&self, font_num: u32) -> Option<String> {
        let font = self.get(font_num)?;
        if font.is_placeholder() {
            return None;
        }
        get_path_to_font(&format!("{}.tfm", font.font_name))
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Iterates over the known fonts in order of their font numbers.
    pub fn iter(&self) -> impl Iterator<Item = &FontDefinition> {
        self.fonts.values()
    }
}

/// Reads the parameters of a fnt_def command whose opcode has already been
/// consumed. `size` is the width of the font number, 1 for fnt_def1
/// through 4 for fnt_def4.
pub fn read_font_def(
    reader: &mut ByteCursor,
    size: usize,
) -> CursorResult<FontDefinition> {
    let k = reader.read_unsigned(size)?;
    let c = reader.read_4_bytes_unsigned()?;
    let s = reader.read_4_bytes_unsigned()?;
    let d = reader.read_4_bytes_unsigned()?;
    let a = reader.read_1_byte_unsigned()?;
    let l = reader.read_1_byte_unsigned()?;
    let n = reader.read_string(a as usize + l as usize)?;

    debug!("fnt_def {}: {} at {}/{}", k, n, s, d);
    Ok(FontDefinition::new(k, c, s, d, n))
}
