//! Configuration-source contract
//!
//! Skin definitions are parsed by an external component; the engine consumes
//! them through [`ConfigSource`]. Sections keep their declaration order
//! (declaration order is the meters' paint order), keys are matched
//! case-insensitively.

use crate::types::RectI;

/// Read access to one skin's parsed configuration.
///
/// All typed readers fall back to `default` when the key is missing or does
/// not parse; the engine never treats a malformed option as fatal.
pub trait ConfigSource {
    /// Section names in declaration order.
    fn sections(&self) -> Vec<String>;

    /// Raw value lookup; `None` when the key is absent.
    fn read_raw(&self, section: &str, key: &str) -> Option<String>;

    /// Set `section.key = value` (`!SetOption`, `!SetVariable`). Returns
    /// whether the source accepts writes; read-only sources refuse.
    fn write_raw(&mut self, _section: &str, _key: &str, _value: &str) -> bool {
        false
    }

    /// Evaluate a formula expression to a number. The reference
    /// implementation handles plain numeric literals; a full expression
    /// evaluator is the hosting application's concern.
    fn parse_formula(&self, expr: &str) -> Option<f64> {
        expr.trim().parse::<f64>().ok()
    }

    fn read_string(&self, section: &str, key: &str, default: &str) -> String {
        self.read_raw(section, key)
            .unwrap_or_else(|| default.to_owned())
    }

    fn read_int(&self, section: &str, key: &str, default: i32) -> i32 {
        self.read_raw(section, key)
            .and_then(|v| parse_int(&v))
            .unwrap_or(default)
    }

    fn read_uint(&self, section: &str, key: &str, default: u32) -> u32 {
        self.read_raw(section, key)
            .and_then(|v| parse_int(&v))
            .map(|v| v.max(0) as u32)
            .unwrap_or(default)
    }

    fn read_float(&self, section: &str, key: &str, default: f64) -> f64 {
        self.read_raw(section, key)
            .and_then(|v| self.parse_formula(&v))
            .unwrap_or(default)
    }

    fn read_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.read_int(section, key, default as i32) != 0
    }

    /// Color as RGBA bytes. Accepts `R,G,B[,A]` decimal lists and
    /// `RRGGBB[AA]` hex strings.
    fn read_color(&self, section: &str, key: &str, default: [u8; 4]) -> [u8; 4] {
        self.read_raw(section, key)
            .and_then(|v| parse_color(&v))
            .unwrap_or(default)
    }

    /// Rectangle as `left,top,right,bottom`.
    fn read_rect(&self, section: &str, key: &str, default: RectI) -> RectI {
        self.read_raw(section, key)
            .and_then(|v| parse_rect(&v))
            .unwrap_or(default)
    }
}

/// Leading-integer parse; tolerates trailing garbage the way the original
/// option readers do (`"10px"` reads as 10).
pub fn parse_int(value: &str) -> Option<i32> {
    let s = value.trim();
    let end = s
        .char_indices()
        .take_while(|&(i, c)| c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    s[..end].parse::<i32>().ok()
}

/// Parse `R,G,B[,A]` or `RRGGBB[AA]` into RGBA bytes.
pub fn parse_color(value: &str) -> Option<[u8; 4]> {
    let s = value.trim();
    if s.contains(',') {
        let mut parts = s.split(',').map(|p| p.trim().parse::<u8>());
        let r = parts.next()?.ok()?;
        let g = parts.next()?.ok()?;
        let b = parts.next()?.ok()?;
        let a = match parts.next() {
            Some(v) => v.ok()?,
            None => 255,
        };
        Some([r, g, b, a])
    } else {
        let s = s.trim_start_matches('#');
        if s.len() != 6 && s.len() != 8 {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).ok();
        let r = byte(0)?;
        let g = byte(2)?;
        let b = byte(4)?;
        let a = if s.len() == 8 { byte(6)? } else { 255 };
        Some([r, g, b, a])
    }
}

fn parse_rect(value: &str) -> Option<RectI> {
    let mut parts = value.split(',').map(|p| p.trim().parse::<i32>());
    Some(RectI::new(
        parts.next()?.ok()?,
        parts.next()?.ok()?,
        parts.next()?.ok()?,
        parts.next()?.ok()?,
    ))
}

/// Ordered in-memory configuration, the reference [`ConfigSource`].
///
/// Used for embedding and tests; the hosting application supplies its own
/// parser-backed source for real skin files.
#[derive(Debug, Default, Clone)]
pub struct MemoryConfig {
    sections: Vec<(String, Vec<(String, String)>)>,
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `section.key = value`, creating the section at the end of the
    /// declaration order if needed.
    pub fn set(&mut self, section: &str, key: &str, value: &str) -> &mut Self {
        let entry = match self
            .sections
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(section))
        {
            Some((_, entry)) => entry,
            None => {
                self.sections.push((section.to_owned(), Vec::new()));
                &mut self.sections.last_mut().unwrap().1
            }
        };
        match entry.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
            Some((_, v)) => *v = value.to_owned(),
            None => entry.push((key.to_owned(), value.to_owned())),
        }
        self
    }

    pub fn remove(&mut self, section: &str, key: &str) {
        if let Some((_, entry)) = self
            .sections
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(section))
        {
            entry.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
        }
    }
}

impl ConfigSource for MemoryConfig {
    fn sections(&self) -> Vec<String> {
        self.sections.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read_raw(&self, section: &str, key: &str) -> Option<String> {
        self.sections
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(section))
            .and_then(|(_, entry)| {
                entry
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(key))
                    .map(|(_, v)| v.clone())
            })
    }

    fn write_raw(&mut self, section: &str, key: &str, value: &str) -> bool {
        self.set(section, key, value);
        true
    }
}
