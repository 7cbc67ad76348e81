//! Stylesheet tree building
//!
//!     Rules become tree nodes; everything else only changes builder state. Attribute
//!     lines are buffered and attached when the next rule line arrives (and once more at
//!     the end of input), because an attribute can only be placed once the builder knows
//!     which rule is still open at the attribute's level.
//!
//!     Attribute placement:
//!
//!         a                 depth 0 rule
//!           :color red      depth 1 attribute -> level 0 -> attached to `a`
//!           :font           depth 1 namespace
//!             :size 2em     depth 2 attribute -> `font-size`, level 0 -> attached to `a`
//!
//!     A namespace stays active only for lines exactly one level below it; any other line
//!     (or any rule) closes it.

use tracing::warn;

use super::line_classification::{classify_line, StyleLine};
use super::node::{StyleNode, StyleTree};
use super::StylesheetError;
use crate::calculator::Calculator;
use crate::lexing::{split_lines, IndentUnit};
use crate::tree::TreeBuilder;

#[derive(Debug, Default)]
struct Namespace {
    name: String,
    depth: usize,
}

/// Folds stylesheet source into a [StyleTree], defining constants on the way.
pub struct StyleTreeBuilder<'a> {
    calculator: &'a mut Calculator,
    builder: TreeBuilder<StyleNode>,
    namespace: Option<Namespace>,
    pending: Vec<(String, String)>,
    pending_level: Option<usize>,
}

impl<'a> StyleTreeBuilder<'a> {
    pub fn new(calculator: &'a mut Calculator) -> Self {
        StyleTreeBuilder {
            calculator,
            builder: TreeBuilder::new(),
            namespace: None,
            pending: Vec::new(),
            pending_level: None,
        }
    }

    pub fn build(mut self, source: &str, unit: IndentUnit) -> Result<StyleTree, StylesheetError> {
        for line in split_lines(source, unit) {
            let depth = line.depth;
            match classify_line(line.content()) {
                StyleLine::Blank | StyleLine::Comment => {}
                StyleLine::Constant { name, value } => self.calculator.define(name, value),
                StyleLine::Namespace(name) => self.namespace = Some(Namespace { name, depth }),
                StyleLine::ComputedAttribute { name, expression } => {
                    let value = self.calculator.calculate(&expression).map_err(|source| {
                        StylesheetError::Calculation {
                            line: line.number,
                            source,
                        }
                    })?;
                    self.buffer_attribute(name, value, depth, line.number);
                }
                StyleLine::Attribute { name, value } => {
                    self.buffer_attribute(name, value, depth, line.number)
                }
                StyleLine::Rule(rule) => {
                    self.namespace = None;
                    self.flush();
                    self.builder.push(depth, StyleNode::new(rule, line.number));
                }
            }
        }
        self.flush();
        Ok(self.builder.finish())
    }

    fn buffer_attribute(&mut self, name: String, value: String, depth: usize, line: usize) {
        if self
            .namespace
            .as_ref()
            .is_some_and(|ns| ns.depth + 1 != depth)
        {
            self.namespace = None;
        }
        let (name, offset) = match &self.namespace {
            Some(ns) => (format!("{}-{}", ns.name, name), 2),
            None => (name, 1),
        };
        match depth.checked_sub(offset) {
            Some(level) => {
                if self.pending_level.is_some_and(|pending| pending != level) {
                    self.flush();
                }
                self.pending_level = Some(level);
                match self.pending.iter_mut().find(|(known, _)| *known == name) {
                    Some(slot) => slot.1 = value,
                    None => self.pending.push((name, value)),
                }
            }
            None => warn!(line, attribute = %name, "attribute outside of any rule ignored"),
        }
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let attributes = std::mem::take(&mut self.pending);
        let target = self
            .pending_level
            .take()
            .and_then(|level| self.builder.open_at(level));
        match target {
            Some(id) => {
                let node = self.builder.tree_mut().get_mut(id);
                for (name, value) in attributes {
                    node.set_attribute(name, value);
                }
            }
            None => warn!(
                count = attributes.len(),
                "attributes with no rule at their level ignored"
            ),
        }
    }
}
