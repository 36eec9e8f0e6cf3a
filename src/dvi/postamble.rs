use log::{debug, warn};

use super::byte_cursor::ByteCursor;
use super::error::{LoadError, LoadResult};
use super::fonts::{read_font_def, FontRegistry, Registration};
use super::opcodes::{FNT_DEF1, FNT_DEF4, NOP, POST, POST_POST, TRAILER};
use super::preamble::Preamble;

/// The summary TeX writes after the last page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Postamble {
    /// Offset of the last bop, or 0xffffffff when there are no pages.
    pub last_page_offset: u32,
    pub num: u32,
    pub den: u32,
    pub mag: u32,
    pub max_page_height: u32,
    pub max_page_width: u32,
    pub max_stack_depth: u16,
    pub total_pages: u16,
}

/// Finds the offset of the post command by walking backwards from the end
/// of the file: past the trailing 223s, over the format id, to the pointer
/// stored after post_post.
pub fn find_postamble(
    data: &[u8],
    format: u8,
    max_padding: usize,
) -> LoadResult<u32> {
    let mut end = data.len();
    let mut padding = 0;
    while end > 0 && data[end - 1] == TRAILER {
        if padding == max_padding {
            return Err(LoadError::TruncatedFile(format!(
                "more than {} trailing padding bytes",
                max_padding
            )));
        }
        end -= 1;
        padding += 1;
    }

    if padding == 0 {
        return Err(LoadError::TruncatedFile(
            "the file does not end with trailer bytes".to_string(),
        ));
    }

    // post_post, a four byte pointer and the format id precede the padding.
    if end < 6 {
        return Err(LoadError::TruncatedFile(
            "the file is too short to hold a postamble".to_string(),
        ));
    }
    let id = data[end - 1];
    if id != format {
        return Err(LoadError::TruncatedFile(format!(
            "trailer format {} doesn't match preamble format {}",
            id, format
        )));
    }
    let post_post_offset = end - 6;
    if data[post_post_offset] != POST_POST {
        return Err(LoadError::TruncatedFile(
            "no post_post command before the trailer".to_string(),
        ));
    }

    let mut reader = ByteCursor::at(data, post_post_offset + 1);
    let pointer = reader.read_4_bytes_unsigned().map_err(|_| {
        LoadError::TruncatedFile("file ends inside post_post".to_string())
    })?;

    if pointer as usize >= post_post_offset {
        return Err(LoadError::CorruptPostamble(format!(
            "postamble pointer {} is outside of the file",
            pointer
        )));
    }
    if data[pointer as usize] != POST {
        return Err(LoadError::CorruptPostamble(format!(
            "no post command at offset {}",
            pointer
        )));
    }

    debug!(
        "postamble at {} ({} padding bytes)",
        pointer, padding
    );
    Ok(pointer)
}

impl Postamble {
    /// Reads the postamble starting at `offset` along with the font
    /// definitions that follow it. Font number clashes are recorded in
    /// `error_counter` rather than failing.
    pub fn read_from(
        reader: &mut ByteCursor,
        offset: u32,
        preamble: &Preamble,
        fonts: &mut FontRegistry,
        error_counter: &mut u32,
    ) -> LoadResult<Self> {
        reader.seek(offset as usize);
        let truncated = |_| {
            LoadError::CorruptPostamble("file ends inside the postamble".to_string())
        };

        let opcode = reader.read_1_byte_unsigned().map_err(truncated)?;
        if opcode != POST {
            return Err(LoadError::CorruptPostamble(format!(
                "expected post, found opcode {}",
                opcode
            )));
        }

        let p = reader.read_4_bytes_unsigned().map_err(truncated)?;
        let num = reader.read_4_bytes_unsigned().map_err(truncated)?;
        let den = reader.read_4_bytes_unsigned().map_err(truncated)?;
        let mag = reader.read_4_bytes_unsigned().map_err(truncated)?;
        let l = reader.read_4_bytes_unsigned().map_err(truncated)?;
        let u = reader.read_4_bytes_unsigned().map_err(truncated)?;
        let s = reader.read_2_bytes_unsigned().map_err(truncated)?;
        let t = reader.read_2_bytes_unsigned().map_err(truncated)?;

        if num != preamble.num || den != preamble.den || mag != preamble.mag {
            return Err(LoadError::InconsistentUnits {
                preamble_num: preamble.num,
                preamble_den: preamble.den,
                preamble_mag: preamble.mag,
                postamble_num: num,
                postamble_den: den,
                postamble_mag: mag,
            });
        }

        loop {
            let opcode = reader.read_1_byte_unsigned().map_err(truncated)?;
            match opcode {
                FNT_DEF1..=FNT_DEF4 => {
                    let size = (opcode - FNT_DEF1 + 1) as usize;
                    let font = read_font_def(reader, size).map_err(truncated)?;
                    if fonts.register(font) == Registration::Conflict {
                        *error_counter = error_counter.saturating_add(1);
                    }
                }
                NOP => {}
                POST_POST => break,
                other => {
                    return Err(LoadError::CorruptPostamble(format!(
                        "unexpected opcode {} among the font definitions",
                        other
                    )));
                }
            }
        }

        if t == 0 && p != u32::MAX {
            warn!("postamble has no pages but a last page pointer of {}", p);
        }

        debug!(
            "postamble: {} pages, last page at {}, {} fonts",
            t,
            p,
            fonts.len()
        );

        Ok(Postamble {
            last_page_offset: p,
            num,
            den,
            mag,
            max_page_height: l,
            max_page_width: u,
            max_stack_depth: s,
            total_pages: t,
        })
    }
}
