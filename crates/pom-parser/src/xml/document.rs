use super::token::{tokenize, Token};

/// Index of an element inside its [`XmlDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

/// Half-open byte range `[start, end)` in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: String,
    pub value: String,
}

/// Literal content of a text-only element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlText {
    pub value: String,
    /// Inclusive offset of the first non-blank character.
    pub start: usize,
    /// Inclusive offset of the last non-blank character.
    pub end: usize,
}

impl XmlText {
    pub fn range(&self) -> ByteRange {
        ByteRange::new(self.start, self.end + 1)
    }
}

/// An element with the offsets it occupies in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Empty for the synthetic document root.
    pub tag_name: String,
    /// Offset of the opening `<`.
    pub start: usize,
    /// Offset of the final `>` (inclusive).
    pub end: usize,
    /// First offset after the opening tag, `None` for `<a/>`.
    pub content_start: Option<usize>,
    /// Offset of the `<` of the closing tag, `None` for `<a/>`.
    pub content_end: Option<usize>,
    pub attributes: Vec<XmlAttribute>,
    pub text: Option<XmlText>,
    children: Vec<ElementId>,
    parent: Option<ElementId>,
}

impl XmlElement {
    fn new(tag_name: String, start: usize, end: usize, parent: Option<ElementId>) -> Self {
        Self {
            tag_name,
            start,
            end,
            content_start: None,
            content_end: None,
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
            parent,
        }
    }

    /// The whole element as a half-open range.
    pub fn range(&self) -> ByteRange {
        ByteRange::new(self.start, self.end + 1)
    }

    /// The body between the opening and closing tags.
    pub fn content_range(&self) -> Option<ByteRange> {
        Some(ByteRange::new(self.content_start?, self.content_end?))
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

/// A parsed XML buffer.
///
/// Elements live in an arena owned by the document; parent links are plain
/// indices and only used for upward lookups. Element 0 is a synthetic root
/// spanning the whole buffer whose children are the top-level elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    elements: Vec<XmlElement>,
}

const ROOT: ElementId = ElementId(0);

impl XmlDocument {
    /// Parse `text` into a positioned element tree.
    ///
    /// Never fails: unmatched closing tags are ignored, elements left open at
    /// the end of the buffer end there, elements left open inside a closing
    /// parent end right before the parent's closing tag.
    pub fn parse(text: &str) -> Self {
        let len = text.len();
        let mut root = XmlElement::new(String::new(), 0, len.saturating_sub(1), None);
        root.content_start = Some(0);
        root.content_end = Some(len);
        let mut doc = Self {
            elements: vec![root],
        };

        let mut stack: Vec<ElementId> = vec![ROOT];
        let mut last_opened: Option<ElementId> = None;

        for token in tokenize(text) {
            match token {
                Token::ElementOpen {
                    name,
                    start,
                    end,
                    self_closing,
                } => {
                    let parent = *stack.last().unwrap_or(&ROOT);
                    let mut element = XmlElement::new(name, start, end, Some(parent));
                    if !self_closing {
                        element.content_start = Some(end + 1);
                    }
                    let id = doc.push(element);
                    let parent_element = doc.get_mut(parent);
                    parent_element.children.push(id);
                    // element children win over text
                    parent_element.text = None;
                    if !self_closing {
                        stack.push(id);
                    }
                    last_opened = Some(id);
                }
                Token::Attribute { name, value, .. } => {
                    if let Some(id) = last_opened {
                        doc.get_mut(id).attributes.push(XmlAttribute { name, value });
                    }
                }
                Token::Text { value, start, end } => {
                    last_opened = None;
                    let current = *stack.last().unwrap_or(&ROOT);
                    if current == ROOT {
                        continue;
                    }
                    let element = doc.get_mut(current);
                    if !element.children.is_empty() {
                        continue;
                    }
                    match element.text.as_mut() {
                        // text split by a comment or CDATA section
                        Some(existing) => {
                            existing.value.push_str(&value);
                            existing.end = end;
                        }
                        None => element.text = Some(XmlText { value, start, end }),
                    }
                }
                Token::ElementClose { name, start, end } => {
                    last_opened = None;
                    let Some(depth) = stack
                        .iter()
                        .rposition(|id| *id != ROOT && doc.get(*id).tag_name == name)
                    else {
                        continue;
                    };
                    while stack.len() > depth + 1 {
                        if let Some(open) = stack.pop() {
                            let element = doc.get_mut(open);
                            element.end = start.saturating_sub(1).max(element.start);
                            element.content_end = Some(start.max(element.start));
                        }
                    }
                    if let Some(id) = stack.pop() {
                        let element = doc.get_mut(id);
                        element.end = end;
                        element.content_end = Some(start);
                    }
                }
            }
        }

        for open in stack.into_iter().filter(|id| *id != ROOT) {
            let element = doc.get_mut(open);
            element.end = len.saturating_sub(1).max(element.start);
            element.content_end = Some(len);
        }

        doc
    }

    fn push(&mut self, element: XmlElement) -> ElementId {
        self.elements.push(element);
        ElementId(self.elements.len() - 1)
    }

    fn get_mut(&mut self, id: ElementId) -> &mut XmlElement {
        &mut self.elements[id.0]
    }

    /// The synthetic document root.
    pub fn root(&self) -> ElementId {
        ROOT
    }

    pub fn get(&self, id: ElementId) -> &XmlElement {
        &self.elements[id.0]
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.get(id).parent
    }

    /// Top-level elements of the document.
    pub fn top_level(&self) -> &[ElementId] {
        self.get(ROOT).children()
    }

    /// Number of elements, including the synthetic root.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.len() == 1
    }

    /// Iterate over every element except the synthetic root, in document order.
    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &XmlElement)> {
        self.elements
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, e)| (ElementId(i), e))
    }

    /// Text content of an element, if it is text-only.
    pub fn text_of(&self, id: ElementId) -> Option<&str> {
        self.get(id).text.as_ref().map(|t| t.value.as_str())
    }

    /// First direct child with the given tag.
    pub fn child_by_tag(&self, id: ElementId, tag: &str) -> Option<ElementId> {
        self.get(id)
            .children
            .iter()
            .copied()
            .find(|c| self.get(*c).tag_name == tag)
    }

    /// All direct children with the given tag.
    pub fn children_by_tag<'a>(
        &'a self,
        id: ElementId,
        tag: &'a str,
    ) -> impl Iterator<Item = ElementId> + 'a {
        self.get(id)
            .children
            .iter()
            .copied()
            .filter(move |c| self.get(*c).tag_name == tag)
    }

    /// Text of the first direct child with the given tag.
    pub fn child_text(&self, id: ElementId, tag: &str) -> Option<&str> {
        self.child_by_tag(id, tag).and_then(|c| self.text_of(c))
    }

    /// Depth-first search below `from` (excluding it), in document order.
    pub fn find_elements_by_tag(&self, from: ElementId, tag: &str) -> Vec<ElementId> {
        let mut found = Vec::new();
        let mut pending: Vec<ElementId> = self.get(from).children.iter().rev().copied().collect();
        while let Some(id) = pending.pop() {
            let element = self.get(id);
            if element.tag_name == tag {
                found.push(id);
            }
            pending.extend(element.children.iter().rev().copied());
        }
        found
    }

    /// The innermost element whose inclusive range contains `offset`.
    pub fn find_node_at_offset(&self, offset: usize) -> Option<ElementId> {
        let mut current = ROOT;
        loop {
            let children = &self.get(current).children;
            let idx = children.partition_point(|c| self.get(*c).start <= offset);
            if idx == 0 {
                break;
            }
            let candidate = children[idx - 1];
            if self.get(candidate).end < offset {
                break;
            }
            current = candidate;
        }
        (current != ROOT).then_some(current)
    }

    /// Walk up from `id` (inclusive) to the first element with the given tag.
    pub fn ancestor_by_tag(&self, id: ElementId, tag: &str) -> Option<ElementId> {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ROOT {
                return None;
            }
            if self.get(c).tag_name == tag {
                return Some(c);
            }
            current = self.parent(c);
        }
        None
    }
}
