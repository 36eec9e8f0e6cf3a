//! Physical lengths, used for the page sizes found in DVI files.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Unit {
    Point,
    Pica,
    Inch,
    BigPoint,
    Centimeter,
    Millimeter,
    DidotPoint,
    Cicero,
    ScaledPoint,
}

impl Unit {
    fn from_keyword(keyword: &str) -> Option<Unit> {
        match keyword {
            "pt" => Some(Unit::Point),
            "pc" => Some(Unit::Pica),
            "in" => Some(Unit::Inch),
            "bp" => Some(Unit::BigPoint),
            "cm" => Some(Unit::Centimeter),
            "mm" => Some(Unit::Millimeter),
            "dd" => Some(Unit::DidotPoint),
            "cc" => Some(Unit::Cicero),
            "sp" => Some(Unit::ScaledPoint),
            _ => None,
        }
    }
}

// Return a fractional scale to convert from the passed in unit into
// centimeters. E.g. a return value of (7, 3) would indicate that one of those
// units is 7/3 of a centimeter.
fn get_scale(unit: Unit) -> (f64, f64) {
    match unit {
        Unit::Point => (254.0, 7227.0),
        Unit::Pica => (12.0 * 254.0, 7227.0),
        Unit::Inch => (254.0, 100.0),
        Unit::BigPoint => (254.0, 72.0 * 100.0),
        Unit::Centimeter => (1.0, 1.0),
        Unit::Millimeter => (1.0, 10.0),
        Unit::DidotPoint => (1238.0 * 254.0, 1157.0 * 7227.0),
        Unit::Cicero => (12.0 * 1238.0 * 254.0, 1157.0 * 7227.0),
        Unit::ScaledPoint => (254.0, 65536.0 * 7227.0),
    }
}

/// A physical length, stored in centimeters.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Length(f64);

impl Length {
    pub fn from_unit(num: f64, from_unit: Unit) -> Length {
        let scale = get_scale(from_unit);
        Length(num * scale.0 / scale.1)
    }

    pub fn from_cm(cm: f64) -> Length {
        Length(cm)
    }

    pub fn to_unit(self, to_unit: Unit) -> f64 {
        let scale = get_scale(to_unit);
        self.0 * scale.1 / scale.0
    }

    pub fn cm(self) -> f64 {
        self.0
    }

    pub fn mm(self) -> f64 {
        self.to_unit(Unit::Millimeter)
    }

    /// Parses lengths like "21cm", "8.5in" or "612", which is in points.
    pub fn parse(text: &str) -> Option<Length> {
        let text = text.trim();
        let split = text
            .find(|c: char| c.is_ascii_alphabetic())
            .unwrap_or_else(|| text.len());
        let (number, unit) = text.split_at(split);
        let number = number.trim().parse::<f64>().ok()?;
        let unit = if unit.is_empty() {
            Unit::Point
        } else {
            Unit::from_keyword(unit.trim())?
        };
        if !number.is_finite() || number < 0.0 {
            return None;
        }
        Some(Length::from_unit(number, unit))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: Length,
    pub height: Length,
}

impl PageSize {
    pub fn new(width: Length, height: Length) -> Self {
        PageSize { width, height }
    }

    /// Converts a size given in DVI units.
    pub fn from_dvi_units(width: u32, height: u32, cm_per_unit: f64) -> Self {
        PageSize {
            width: Length::from_cm(width as f64 * cm_per_unit),
            height: Length::from_cm(height as f64 * cm_per_unit),
        }
    }
}
