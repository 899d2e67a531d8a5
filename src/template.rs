// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Output path templates with a single printf-style file number slot

use crate::error::{Result, WriterError};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Radix {
    Decimal,
    LowerHex,
    UpperHex,
    Octal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Conversion {
    zero_pad: bool,
    left_align: bool,
    width: usize,
    radix: Radix,
}

impl Conversion {
    fn render(&self, value: u32) -> String {
        let digits = match self.radix {
            Radix::Decimal => value.to_string(),
            Radix::LowerHex => format!("{:x}", value),
            Radix::UpperHex => format!("{:X}", value),
            Radix::Octal => format!("{:o}", value),
        };

        let width = self.width;
        if self.left_align {
            format!("{:<width$}", digits)
        } else if self.zero_pad {
            format!("{:0>width$}", digits)
        } else {
            format!("{:>width$}", digits)
        }
    }
}

/// A path such as `run-%04u.i3.gz` with exactly one integer conversion
///
/// Supported conversions are `d`, `i`, `u`, `x`, `X` and `o`, with optional
/// `0`/`-` flags, a field width and `h`/`l`/`ll`/`z` length modifiers
/// (accepted and ignored). `%%` is a literal percent sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    prefix: String,
    conversion: Conversion,
    suffix: String,
}

impl PathTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let fail = |reason: String| WriterError::PathFormat {
            template: template.to_string(),
            reason,
        };

        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut conversion = None;
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            let out = if conversion.is_some() {
                &mut suffix
            } else {
                &mut prefix
            };

            if c != '%' {
                out.push(c);
                continue;
            }

            if chars.peek() == Some(&'%') {
                chars.next();
                out.push('%');
                continue;
            }

            if conversion.is_some() {
                return Err(fail(
                    "more than one conversion specifier; exactly one is allowed".to_string(),
                ));
            }

            let mut zero_pad = false;
            let mut left_align = false;
            while let Some(&flag) = chars.peek() {
                match flag {
                    '0' => zero_pad = true,
                    '-' => left_align = true,
                    _ => break,
                }
                chars.next();
            }

            let mut width = 0usize;
            while let Some(digit) = chars.peek().and_then(|d| d.to_digit(10)) {
                width = width
                    .checked_mul(10)
                    .and_then(|w| w.checked_add(digit as usize))
                    .filter(|w| *w <= 64)
                    .ok_or_else(|| fail("field width is too large".to_string()))?;
                chars.next();
            }

            while matches!(chars.peek(), Some('h') | Some('l') | Some('z')) {
                chars.next();
            }

            let radix = match chars.next() {
                Some('d') | Some('i') | Some('u') => Radix::Decimal,
                Some('x') => Radix::LowerHex,
                Some('X') => Radix::UpperHex,
                Some('o') => Radix::Octal,
                Some(other) => {
                    return Err(fail(format!(
                        "'%{}' is not an integer conversion",
                        other
                    )))
                }
                None => return Err(fail("template ends inside a conversion".to_string())),
            };

            conversion = Some(Conversion {
                zero_pad,
                left_align,
                width,
                radix,
            });
        }

        let conversion =
            conversion.ok_or_else(|| fail("no integer conversion specifier found".to_string()))?;

        Ok(Self {
            raw: template.to_string(),
            prefix,
            conversion,
            suffix,
        })
    }

    /// Substitute the file number into the template
    pub fn format(&self, index: u32) -> PathBuf {
        let mut path = String::with_capacity(self.raw.len() + 8);
        path.push_str(&self.prefix);
        path.push_str(&self.conversion.render(index));
        path.push_str(&self.suffix);
        PathBuf::from(path)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for PathTemplate {
    type Err = WriterError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
