use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteCursorError {
    #[error(
        "unexpected end of data: wanted {wanted} bytes at offset {offset}, \
         {len} available in total"
    )]
    UnexpectedEnd {
        offset: usize,
        wanted: usize,
        len: usize,
    },
}

pub type CursorResult<T> = Result<T, ByteCursorError>;

/// A cursor over an in-memory DVI buffer that provides methods for easily
/// reading the specific bits of data the way they are stored in a DVI file.
/// Unlike a stream reader the position is explicit, since locating the
/// postamble means jumping around in the file.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
}

// Generate a generic read_<n>_bytes_<signed/unsigned> function using
// <type>::from_be_bytes.
macro_rules! generate_int_reader_func {
    (fn $func_name:ident() -> $return_type:ident, $size:expr) => {
        pub fn $func_name(&mut self) -> CursorResult<$return_type> {
            let mut buf = [0; $size];
            buf.copy_from_slice(self.take($size)?);
            Ok($return_type::from_be_bytes(buf))
        }
    };
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor { data, position: 0 }
    }

    pub fn at(data: &'a [u8], position: usize) -> Self {
        ByteCursor { data, position }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    pub fn skip(&mut self, count: usize) -> CursorResult<()> {
        self.take(count).map(|_| ())
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, count: usize) -> CursorResult<&'a [u8]> {
        let end = self
            .position
            .checked_add(count)
            .filter(|end| *end <= self.data.len());
        match end {
            Some(end) => {
                let data = self.data;
                let bytes = &data[self.position..end];
                self.position = end;
                Ok(bytes)
            }
            None => Err(ByteCursorError::UnexpectedEnd {
                offset: self.position,
                wanted: count,
                len: self.data.len(),
            }),
        }
    }

    generate_int_reader_func!(fn read_1_byte_unsigned() -> u8, 1);
    generate_int_reader_func!(fn read_2_bytes_unsigned() -> u16, 2);
    generate_int_reader_func!(fn read_4_bytes_unsigned() -> u32, 4);

    // This cannot be generated using generate_int_reader_func!() because there
    // is no u24 type.
    pub fn read_3_bytes_unsigned(&mut self) -> CursorResult<u32> {
        let buf = self.take(3)?;
        Ok(u32::from_be_bytes([0, buf[0], buf[1], buf[2]]))
    }

    generate_int_reader_func!(fn read_1_byte_signed() -> i8, 1);
    generate_int_reader_func!(fn read_2_bytes_signed() -> i16, 2);
    generate_int_reader_func!(fn read_4_bytes_signed() -> i32, 4);

    // This cannot be generated using generate_int_reader_func!() because there
    // is no i24 type.
    pub fn read_3_bytes_signed(&mut self) -> CursorResult<i32> {
        let buf = self.take(3)?;
        Ok(i32::from_be_bytes([buf[0], buf[1], buf[2], 0]) >> 8)
    }

    /// Reads an unsigned big-endian integer that is `size` bytes wide, the
    /// way the fnt_def1..fnt_def4 and xxx1..xxx4 families encode their first
    /// parameter.
    pub fn read_unsigned(&mut self, size: usize) -> CursorResult<u32> {
        match size {
            1 => self.read_1_byte_unsigned().map(u32::from),
            2 => self.read_2_bytes_unsigned().map(u32::from),
            3 => self.read_3_bytes_unsigned(),
            _ => self.read_4_bytes_unsigned(),
        }
    }

    pub fn read_array(&mut self, size: usize) -> CursorResult<&'a [u8]> {
        self.take(size)
    }

    /// Strings in DVI files are not required to be valid utf-8, so invalid
    /// sequences are replaced instead of failing the read.
    pub fn read_string(&mut self, size: usize) -> CursorResult<String> {
        let arr = self.read_array(size)?;
        Ok(String::from_utf8_lossy(arr).into_owned())
    }

    /// Looks at the byte at an arbitrary offset without moving the cursor.
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(offset).copied()
    }
}
