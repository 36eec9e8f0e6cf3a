use log::debug;

use super::byte_cursor::ByteCursor;
use super::error::{LoadError, LoadResult};
use super::opcodes::{DVI_ID, PRE};

/// The fixed header at the start of every DVI file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preamble {
    pub format: u8,
    pub num: u32,
    pub den: u32,
    pub mag: u32,
    pub comment: Vec<u8>,
}

impl Preamble {
    /// Reads the preamble from the start of the buffer, leaving the cursor
    /// just past the comment.
    pub fn read_from(reader: &mut ByteCursor) -> LoadResult<Self> {
        reader.seek(0);
        let truncated = |_| {
            LoadError::MalformedHeader(
                "file ends inside the preamble".to_string(),
            )
        };

        let opcode = reader.read_1_byte_unsigned().map_err(truncated)?;
        if opcode != PRE {
            return Err(LoadError::MalformedHeader(format!(
                "the file does not start with the preamble (found opcode {})",
                opcode
            )));
        }

        let format = reader.read_1_byte_unsigned().map_err(truncated)?;
        if format != DVI_ID {
            return Err(LoadError::MalformedHeader(format!(
                "unknown DVI format: {}",
                format
            )));
        }

        let num = reader.read_4_bytes_unsigned().map_err(truncated)?;
        let den = reader.read_4_bytes_unsigned().map_err(truncated)?;
        let mag = reader.read_4_bytes_unsigned().map_err(truncated)?;
        if num == 0 || den == 0 {
            return Err(LoadError::MalformedHeader(format!(
                "invalid unit fraction {}/{}",
                num, den
            )));
        }

        let k = reader.read_1_byte_unsigned().map_err(truncated)?;
        let comment = reader.read_array(k as usize).map_err(truncated)?.to_vec();

        debug!(
            "preamble: format {} units {}/{} mag {} ({} byte comment)",
            format, num, den, mag, k
        );

        Ok(Preamble {
            format,
            num,
            den,
            mag,
            comment,
        })
    }

    /// The number of centimeters in one DVI unit, as explained in section
    /// A.3 of the DVI driver standard.
    pub fn cm_per_unit(&self) -> f64 {
        (self.num as f64 / self.den as f64) * (self.mag as f64 / 1000.0) * 1e-5
    }

    /// The comment usually names the program that generated the file.
    pub fn comment_string(&self) -> String {
        String::from_utf8_lossy(&self.comment).into_owned()
    }
}
