//! How much generated context a reference shows, or which label replaces it.

use std::sync::Arc;

use crate::doctext::DocNode;
use crate::source_context::SourceContext;

/// How many enclosing names precede a class or member name. Each level
/// implies the ones below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(clippy::arbitrary_source_item_ordering, reason = "variant order is the derived `Ord`")]
pub enum ContainerContext {
    /// The simple name alone.
    None,
    /// Only the classes needed to reach the target from the current page's class.
    NecessaryContainers,
    /// Every enclosing class.
    AllContainers,
    /// Every enclosing class and the package.
    Package,
}

impl ContainerContext {
    /// Whether the package is shown.
    pub const fn is_showing_package(self) -> bool {
        return matches!(self, Self::Package);
    }

    /// Whether all enclosing classes are shown.
    pub const fn is_showing_containers(self) -> bool {
        return matches!(self, Self::AllContainers | Self::Package);
    }

    /// Whether at least the necessary enclosing classes are shown.
    pub const fn is_showing_necessary_containers(self) -> bool {
        return !matches!(self, Self::None);
    }
}

/// User-written link text and the context to interpret it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Label content; never empty.
    pub content: Arc<[DocNode]>,
    /// Context for relative references inside the label.
    pub source: SourceContext,
}

/// Link-detail policy. A label and a generated parameter list never coexist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDetail {
    /// Enclosing names shown.
    container_context: ContainerContext,
    /// Explicit link text, replacing everything generated.
    label: Option<Label>,
    /// Whether executables show their parameter list.
    show_parameters: bool,
}

impl Default for LinkDetail {
    fn default() -> Self {
        return Self::NORMAL;
    }
}

impl LinkDetail {
    /// Parameters and all enclosing classes shown; no package; no label.
    pub const NORMAL: Self = Self {
        container_context: ContainerContext::AllContainers,
        label: None,
        show_parameters: true,
    };

    /// Detail for an explicit label. Empty content means [`LinkDetail::NORMAL`];
    /// otherwise nothing is generated and the label is shown instead.
    pub fn for_label(source: SourceContext, content: &[DocNode]) -> Self {
        if content.is_empty() {
            return Self::NORMAL;
        }
        return Self {
            container_context: ContainerContext::None,
            label: Some(Label { content: content.into(), source }),
            show_parameters: false,
        };
    }

    /// Hide the parameter list.
    pub fn without_parameters(self) -> Self {
        if !self.show_parameters {
            return self;
        }
        return Self { show_parameters: false, ..self };
    }

    /// Show the parameter list; drops any label.
    pub fn with_parameters(self) -> Self {
        if self.show_parameters {
            return self;
        }
        return Self { label: None, show_parameters: true, ..self };
    }

    /// Hide the package. Shown containers stay shown.
    pub fn without_package(self) -> Self {
        if !self.is_showing_package() {
            return self;
        }
        let context = if self.is_showing_containers() {
            ContainerContext::AllContainers
        } else {
            ContainerContext::None
        };
        return Self { container_context: context, ..self };
    }

    /// Show the package, and with it all containers; drops any label.
    pub fn with_package(self) -> Self {
        if self.is_showing_package() {
            return self;
        }
        return Self { container_context: ContainerContext::Package, label: None, ..self };
    }

    /// Show the package unless a label was given.
    pub fn with_package_if_no_label(self) -> Self {
        if self.has_label() {
            return self;
        }
        return self.with_package();
    }

    /// Hide enclosing classes (and so the package).
    pub fn without_containers(self) -> Self {
        if !self.is_showing_containers() {
            return self;
        }
        return Self { container_context: ContainerContext::None, ..self };
    }

    /// Show all enclosing classes; drops any label.
    pub fn with_containers(self) -> Self {
        if self.is_showing_containers() {
            return self;
        }
        return Self { container_context: ContainerContext::AllContainers, label: None, ..self };
    }

    /// Keep only the enclosing classes needed from the current page.
    pub fn without_nonessential_containers(self) -> Self {
        if !self.is_showing_necessary_containers() {
            return self;
        }
        return Self { container_context: ContainerContext::NecessaryContainers, ..self };
    }

    /// Enclosing names shown.
    pub const fn container_context(&self) -> ContainerContext {
        return self.container_context;
    }

    /// Whether the package is shown.
    pub const fn is_showing_package(&self) -> bool {
        return self.container_context.is_showing_package();
    }

    /// Whether all enclosing classes are shown.
    pub const fn is_showing_containers(&self) -> bool {
        return self.container_context.is_showing_containers();
    }

    /// Whether at least the necessary enclosing classes are shown.
    pub const fn is_showing_necessary_containers(&self) -> bool {
        return self.container_context.is_showing_necessary_containers();
    }

    /// Whether executables show their parameters.
    pub const fn is_showing_parameters(&self) -> bool {
        return self.show_parameters;
    }

    /// Whether a label replaces generated text.
    pub const fn has_label(&self) -> bool {
        return self.label.is_some();
    }

    /// The label, if any.
    pub const fn label(&self) -> Option<&Label> {
        return self.label.as_ref();
    }
}
