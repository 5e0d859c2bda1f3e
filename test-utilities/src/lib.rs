//! Helpers shared by the integration tests and the fuzz targets.

use std::fmt;

/// Separates a symbol from its expected rendering in golden files.
pub const GOLDEN_SEPARATOR: &str = " ---> ";

/// One line of a golden file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GoldenCase<'a> {
    /// Line number, starting at 1.
    pub line: usize,
    /// The mangled symbol.
    pub mangled: &'a str,
    /// The expected rendering.
    pub expected: &'a str,
}

/// Parses a `mangled ---> expected` line. Blank lines and lines starting with `#` yield `None`.
#[must_use]
pub fn parse_golden_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_end_matches('\r');

    if line.trim().is_empty() || line.starts_with('#') {
        return None;
    }

    line.split_once(GOLDEN_SEPARATOR)
}

/// Returns every case in `data`, panicking on malformed lines so that typos in golden files do not pass silently.
#[must_use]
pub fn golden_cases(data: &str) -> Vec<GoldenCase<'_>> {
    data.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty() && !line.starts_with('#'))
        .map(|(i, line)| {
            let (mangled, expected) = parse_golden_line(line)
                .unwrap_or_else(|| panic!("line {} is not a golden case: {line:?}", i + 1));

            GoldenCase {
                line: i + 1,
                mangled,
                expected,
            }
        })
        .collect()
}

/// A writer that fails once more than a fixed number of bytes have been written.
pub struct BoundedWriter<T> {
    inner: T,
    capacity: usize,
}

impl<T> BoundedWriter<T> {
    /// Wraps `inner`, allowing at most `capacity` bytes.
    pub const fn new(inner: T, capacity: usize) -> Self {
        Self { inner, capacity }
    }

    /// Returns the wrapped writer.
    pub const fn inner(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Unwraps the writer.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> fmt::Write for BoundedWriter<T>
where
    T: fmt::Write,
{
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let s_len = s.len();

        if s_len <= self.capacity {
            self.inner.write_str(s)?;
            self.capacity -= s_len;

            Ok(())
        } else {
            Err(fmt::Error)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write;

    #[test]
    fn test_parse_golden_line() {
        assert_eq!(
            super::parse_golden_line("$s4main3fooyyF ---> main.foo() -> ()"),
            Some(("$s4main3fooyyF", "main.foo() -> ()"))
        );
        assert_eq!(super::parse_golden_line("# comment"), None);
        assert_eq!(super::parse_golden_line("   "), None);
        assert_eq!(super::parse_golden_line("no separator"), None);
    }

    #[test]
    fn test_golden_cases() {
        let cases = super::golden_cases("# header\n\na ---> b\nc ---> d ---> e\n");

        assert_eq!(cases.len(), 2);
        assert_eq!((cases[0].line, cases[0].mangled, cases[0].expected), (3, "a", "b"));
        assert_eq!((cases[1].mangled, cases[1].expected), ("c", "d ---> e"));
    }

    #[test]
    fn test_bounded_writer() {
        let mut writer = super::BoundedWriter::new(String::new(), 5);

        assert!(writer.write_str("abc").is_ok());
        assert!(writer.write_str("def").is_err());
        assert!(writer.write_str("de").is_ok());
        assert_eq!(writer.into_inner(), "abcde");
    }
}
