//! Cascade-based field resolution against an unknown DOM.
//!
//! A `SelectorCascade` is an ordered list of strategies for one logical
//! field. Strategies are tried in order and the first non-empty result
//! wins; misses and recoverable session faults are expected under
//! changing markup and never escape the resolver.

use std::sync::Arc;

use tracing::trace;

use crate::infrastructure::session::{DomSession, Scope, SessionResult};

/// Where a strategy reads its value from once an element matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// The element's text content.
    Text,
    /// A single named attribute.
    Attribute(String),
    /// The first non-empty attribute out of an ordered priority list.
    AttributePriority(Vec<String>),
}

/// One lookup strategy: a CSS selector plus a value source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorStrategy {
    pub selector: String,
    pub source: ValueSource,
}

/// Ordered fallback strategies for one logical field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorCascade {
    strategies: Vec<SelectorStrategy>,
}

impl SelectorCascade {
    pub fn new(strategies: Vec<SelectorStrategy>) -> Self {
        Self { strategies }
    }

    /// Cascade reading element text through each selector in turn.
    pub fn text(selectors: &[String]) -> Self {
        Self::new(
            selectors
                .iter()
                .map(|selector| SelectorStrategy {
                    selector: selector.clone(),
                    source: ValueSource::Text,
                })
                .collect(),
        )
    }

    /// Cascade reading one named attribute through each selector in turn.
    pub fn attribute(selectors: &[String], name: &str) -> Self {
        Self::new(
            selectors
                .iter()
                .map(|selector| SelectorStrategy {
                    selector: selector.clone(),
                    source: ValueSource::Attribute(name.to_string()),
                })
                .collect(),
        )
    }

    /// Cascade reading the first non-empty of several attributes.
    pub fn attribute_priority(selectors: &[String], names: &[&str]) -> Self {
        let names: Vec<String> = names.iter().map(|name| (*name).to_string()).collect();
        Self::new(
            selectors
                .iter()
                .map(|selector| SelectorStrategy {
                    selector: selector.clone(),
                    source: ValueSource::AttributePriority(names.clone()),
                })
                .collect(),
        )
    }

    pub fn strategies(&self) -> &[SelectorStrategy] {
        &self.strategies
    }
}

/// Resolves one logical field from a scope using an ordered cascade.
#[derive(Clone)]
pub struct FieldResolver {
    session: Arc<dyn DomSession>,
}

impl FieldResolver {
    pub fn new(session: Arc<dyn DomSession>) -> Self {
        Self { session }
    }

    /// Try each strategy in cascade order against the scope.
    ///
    /// Returns the first non-empty value, or an empty string when every
    /// strategy misses or fails. Only a fatal session error propagates.
    pub async fn resolve(&self, scope: Scope, cascade: &SelectorCascade) -> SessionResult<String> {
        for (index, strategy) in cascade.strategies().iter().enumerate() {
            match self.try_strategy(scope, strategy).await {
                Ok(Some(value)) => {
                    trace!(selector = %strategy.selector, "strategy {index} matched");
                    return Ok(value);
                }
                Ok(None) => {}
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    trace!(selector = %strategy.selector, "strategy {index} failed: {err}");
                }
            }
        }
        Ok(String::new())
    }

    async fn try_strategy(
        &self,
        scope: Scope,
        strategy: &SelectorStrategy,
    ) -> SessionResult<Option<String>> {
        let matches = self.session.find(scope, &strategy.selector).await?;
        let Some(&element) = matches.first() else {
            return Ok(None);
        };

        let value = match &strategy.source {
            ValueSource::Text => self.session.text(element).await?,
            ValueSource::Attribute(name) => self
                .session
                .attribute(element, name)
                .await?
                .unwrap_or_default(),
            ValueSource::AttributePriority(names) => {
                let mut found = String::new();
                for name in names {
                    if let Some(candidate) = self.session.attribute(element, name).await? {
                        if !candidate.trim().is_empty() {
                            found = candidate;
                            break;
                        }
                    }
                }
                found
            }
        };

        let value = value.trim().to_string();
        Ok(if value.is_empty() { None } else { Some(value) })
    }
}
