use crate::Cursor;
use num_traits::{CheckedAdd, CheckedMul};
use std::str;

/// A cursor over the not yet consumed suffix of a byte string.
#[derive(Clone, Copy, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    #[must_use]
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    pub fn advance(&mut self, count: usize) {
        self.position = self.data.len().min(self.position + count);
    }

    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.position >= self.data.len()
    }

    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    #[must_use]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.position + offset).copied()
    }

    #[expect(clippy::should_implement_trait, reason = "not an iterator, `push_back` can rewind")]
    pub fn next(&mut self) -> Option<u8> {
        let c = self.peek()?;

        self.position += 1;

        Some(c)
    }

    pub fn next_if(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.position += 1;

            true
        } else {
            false
        }
    }

    pub fn next_if_any(&mut self, candidates: &[u8]) -> Option<u8> {
        let c = self.peek().filter(|c| candidates.contains(c))?;

        self.position += 1;

        Some(c)
    }

    pub fn next_if_str(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s.as_bytes()) {
            self.position += s.len();

            true
        } else {
            false
        }
    }

    /// Re-inserts the most recently consumed byte.
    pub fn push_back(&mut self) -> bool {
        if self.position == 0 {
            false
        } else {
            self.position -= 1;

            true
        }
    }

    /// Consumes everything that is left.
    pub fn take_rest(&mut self) -> &'a [u8] {
        let rest = self.rest();

        self.position = self.data.len();

        rest
    }

    pub fn slice(&mut self, length: usize) -> Option<&'a [u8]> {
        let end = self.position.checked_add(length)?;
        let result = self.data.get(self.position..end)?;

        self.position = end;

        Some(result)
    }

    pub fn text(&mut self, length: usize) -> Option<&'a str> {
        let saved = self.position;
        let result = self.slice(length).and_then(|bytes| str::from_utf8(bytes).ok());

        if result.is_none() {
            self.position = saved;
        }

        result
    }

    #[must_use]
    pub fn peek_digit(&self) -> bool {
        self.peek().is_some_and(|c| c.is_ascii_digit())
    }

    /// Parses one or more decimal digits.
    pub fn natural<T>(&mut self) -> Option<T>
    where
        T: CheckedAdd + CheckedMul + From<u8>,
    {
        if !self.peek_digit() {
            return None;
        }

        let ten = T::from(10);
        let mut value = T::from(0);

        while let Some(c) = self.peek().filter(u8::is_ascii_digit) {
            value = value.checked_mul(&ten)?.checked_add(&T::from(c - b'0'))?;
            self.position += 1;
        }

        Some(value)
    }

    /// Parses `_` as 0 and `<natural>_` as natural + 1.
    pub fn index(&mut self) -> Option<u64> {
        if self.next_if(b'_') {
            return Some(0);
        }

        let value = self.natural::<u64>()?;

        if self.next_if(b'_') { value.checked_add(1) } else { None }
    }
}

impl Cursor for ByteCursor<'_> {
    type Cursor = usize;

    fn get_cursor(&self) -> Self::Cursor {
        self.position
    }

    fn set_cursor(&mut self, cursor: Self::Cursor) {
        self.position = cursor;
    }
}

#[cfg(test)]
mod tests {
    use super::ByteCursor;
    use crate::CursorExt;

    #[test]
    fn test_natural() {
        #[track_caller]
        fn check(input: &str, expected: Option<u64>, rest: &str) {
            let mut cursor = ByteCursor::new(input.as_bytes());

            assert_eq!(cursor.natural::<u64>(), expected);
            assert_eq!(cursor.rest(), rest.as_bytes());
        }

        check("", None, "");
        check("a", None, "a");
        check("0", Some(0), "");
        check("07", Some(7), "");
        check("42abc", Some(42), "abc");
        check("99999999999999999999999", None, "99999999999999999999999");
    }

    #[test]
    fn test_index() {
        #[track_caller]
        fn check(input: &str, expected: Option<u64>) {
            assert_eq!(ByteCursor::new(input.as_bytes()).index(), expected);
        }

        check("_", Some(0));
        check("0_", Some(1));
        check("12_", Some(13));
        check("12", None);
        check("x", None);
    }

    #[test]
    fn test_push_back() {
        let mut cursor = ByteCursor::new(b"ab");

        assert!(!cursor.push_back());
        assert_eq!(cursor.next(), Some(b'a'));
        assert!(cursor.push_back());
        assert_eq!(cursor.next(), Some(b'a'));
        assert_eq!(cursor.next(), Some(b'b'));
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn test_next_if_str_and_text() {
        let mut cursor = ByteCursor::new(b"_T0hello");

        assert!(!cursor.next_if_str("$s"));
        assert!(cursor.next_if_str("_T0"));
        assert_eq!(cursor.text(10), None);
        assert_eq!(cursor.text(5), Some("hello"));
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_transaction_restores_position() {
        let mut cursor = ByteCursor::new(b"abc");

        assert_eq!(
            cursor.transaction(|cursor| {
                cursor.next();
                cursor.next();

                None::<()>
            }),
            None
        );

        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.transaction(ByteCursor::next), Some(b'a'));
        assert_eq!(cursor.position(), 1);
    }
}
