//! Code generation over the final annotated tree.
//!
//! Three output families: `ts`/`js`/`dts` (a runtime module with or without
//! static types, or declarations only) live in [`ts`]; `bare` (canonical
//! re-serialization of the schema) lives in [`bare`].

pub mod bare;
pub mod ts;

/// Line-oriented output buffer with block indentation.
pub(crate) struct Out {
    buf: String,
    pub indent: usize,
}

impl Out {
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            indent: 0,
        }
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.indent {
                self.buf.push_str("    ");
            }
            self.buf.push_str(text);
        }
        self.buf.push('\n');
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    /// Write `text` and indent the following lines.
    pub fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.indent += 1;
    }

    /// Dedent, then write `text`.
    pub fn close(&mut self, text: impl AsRef<str>) {
        self.indent -= 1;
        self.line(text);
    }

    pub fn finish(self) -> String {
        self.buf
    }
}
