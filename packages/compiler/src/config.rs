use crate::error::CompileResult;
use loom_tree::Element;
use serde::{Deserialize, Serialize};

/// Where side assets (component styles and scripts) end up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssetPlacement {
    /// Right before the first substitution of each component
    #[default]
    Inline,
    /// Appended to `html > head` (or the root) once compilation is done
    Head,
}

/// Conditional directive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    If,
    Elif,
    Else,
}

/// Compiler configuration. Every directive spelling lives here so the
/// passes never hard-code attribute or tag names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerConfig {
    pub if_attribute: String,
    pub elif_attribute: String,
    pub else_attribute: String,

    /// Tag of loop elements and the attribute holding the iteration spec
    pub loop_tag: String,
    pub loop_attribute: String,

    /// Attribute-name prefix meaning "evaluate the whole value as code"
    pub code_prefix: String,

    pub slot_tag: String,
    /// Attribute on call-site children selecting a named slot
    pub slot_attribute: String,

    /// Wrapper tags replaced by their children
    pub fragment_tags: Vec<String>,

    /// Tag of setup blocks executed before compilation
    pub setup_tag: String,

    /// Text below these tags is interpolated but never re-spaced
    pub preformatted_tags: Vec<String>,

    /// Text below these tags is never interpolated
    pub raw_text_tags: Vec<String>,

    /// HTML-escape values substituted into text
    pub escape_html: bool,

    pub asset_placement: AssetPlacement,

    /// Binding under which chained fallbacks see why a loop failed
    pub loop_error_binding: String,

    /// Binding holding the call-site children of a component
    pub children_binding: String,

    /// Attribute stamped on component roots whose template has scoped styles
    pub scope_attribute: String,

    /// How many times a component may appear in its own ancestor chain
    pub max_component_depth: usize,

    /// Treat unregistered capitalized tags as missing components
    pub strict_components: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            if_attribute: "@if".to_string(),
            elif_attribute: "@elif".to_string(),
            else_attribute: "@else".to_string(),
            loop_tag: "For".to_string(),
            loop_attribute: "each".to_string(),
            code_prefix: ":".to_string(),
            slot_tag: "Slot".to_string(),
            slot_attribute: "slot".to_string(),
            fragment_tags: vec![String::new(), "Template".to_string()],
            setup_tag: "setup".to_string(),
            preformatted_tags: vec!["pre".to_string(), "code".to_string(), "textarea".to_string()],
            raw_text_tags: vec!["script".to_string(), "style".to_string()],
            escape_html: true,
            asset_placement: AssetPlacement::Inline,
            loop_error_binding: "loop_error".to_string(),
            children_binding: "children".to_string(),
            scope_attribute: "data-loom-scope".to_string(),
            max_component_depth: 32,
            strict_components: true,
        }
    }
}

impl CompilerConfig {
    pub fn from_json(json: &str) -> CompileResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn directive(&self, attribute: &str) -> Option<Directive> {
        if attribute == self.if_attribute {
            Some(Directive::If)
        } else if attribute == self.elif_attribute {
            Some(Directive::Elif)
        } else if attribute == self.else_attribute {
            Some(Directive::Else)
        } else {
            None
        }
    }

    pub fn directive_attribute(&self, directive: Directive) -> &str {
        match directive {
            Directive::If => &self.if_attribute,
            Directive::Elif => &self.elif_attribute,
            Directive::Else => &self.else_attribute,
        }
    }

    /// Conditional directives present on an element, in attribute order
    pub fn directives_of<'a>(&self, element: &'a Element) -> Vec<(Directive, &'a str)> {
        element
            .attributes
            .keys()
            .filter_map(|name| self.directive(name).map(|d| (d, name.as_str())))
            .collect()
    }

    pub fn is_loop(&self, element: &Element) -> bool {
        element.tag == self.loop_tag
    }

    /// Either `each` or its code-prefixed spelling `:each`
    pub fn is_loop_attribute(&self, attribute: &str) -> bool {
        attribute == self.loop_attribute
            || attribute
                .strip_prefix(self.code_prefix.as_str())
                .is_some_and(|rest| rest == self.loop_attribute)
    }

    pub fn is_fragment(&self, element: &Element) -> bool {
        self.fragment_tags.iter().any(|t| *t == element.tag)
    }

    /// Tags that carry compiler meaning and are never component references
    pub fn is_reserved_tag(&self, tag: &str) -> bool {
        tag == self.loop_tag
            || tag == self.slot_tag
            || tag == self.setup_tag
            || self.fragment_tags.iter().any(|t| t == tag)
    }

    pub fn is_preformatted_tag(&self, tag: &str) -> bool {
        self.preformatted_tags.iter().any(|t| t == tag)
    }

    pub fn is_raw_text_tag(&self, tag: &str) -> bool {
        self.raw_text_tags.iter().any(|t| t == tag)
    }

    /// Strip the code prefix from an attribute name, if present
    pub fn strip_code_prefix<'a>(&self, attribute: &'a str) -> Option<&'a str> {
        if self.code_prefix.is_empty() {
            return None;
        }
        attribute
            .strip_prefix(self.code_prefix.as_str())
            .filter(|rest| !rest.is_empty())
    }
}
