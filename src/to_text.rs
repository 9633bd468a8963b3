pub trait ToText {
    #[must_use]
    fn to_text(&self, trailing_newline: bool) -> String {
        let mut builder = TextBuilder::default();
        self.build_text(&mut builder);
        builder.finish(trailing_newline)
    }
    fn build_text(&self, builder: &mut TextBuilder);
}

impl<T: ToText> ToText for &T {
    fn build_text(&self, builder: &mut TextBuilder) {
        (*self).build_text(builder);
    }
}

#[derive(Debug, Default)]
pub struct TextBuilder {
    text: String,
}
impl TextBuilder {
    /// Pushes the children's text with `separator` between each pair.
    pub fn push_children<C: ToText>(
        &mut self,
        children: impl IntoIterator<Item = C>,
        separator: &str,
    ) {
        for (index, child) in children.into_iter().enumerate() {
            if index > 0 {
                self.push(separator);
            }
            child.build_text(self);
        }
    }

    /// Pushes the text and ends the current line.
    pub fn push_line(&mut self, text: impl AsRef<str>) {
        self.push(text);
        self.push("\n");
    }

    pub fn push(&mut self, text: impl AsRef<str>) {
        self.text.push_str(text.as_ref());
    }

    #[must_use]
    pub fn finish(mut self, trailing_newline: bool) -> String {
        if trailing_newline && !self.text.is_empty() && !self.text.ends_with('\n') {
            self.push("\n");
        }
        self.text
    }
}
