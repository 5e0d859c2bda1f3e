#![expect(missing_docs, reason = "internal create")]

pub use self::byte_cursor::ByteCursor;

mod byte_cursor;

pub trait Cursor {
    type Cursor;

    fn get_cursor(&self) -> Self::Cursor;
    fn set_cursor(&mut self, cursor: Self::Cursor);
}

pub trait CursorExt: Cursor {
    /// Runs `f`, restoring the cursor to where it was if `f` returns `None`.
    fn transaction<F, T>(&mut self, f: F) -> Option<T>
    where
        F: FnOnce(&mut Self) -> Option<T>,
    {
        let saved_cursor = self.get_cursor();
        let result = f(self);

        if result.is_none() {
            self.set_cursor(saved_cursor);
        }

        result
    }
}

impl<T> CursorExt for T where T: Cursor + ?Sized {}
