use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("unrecognized dependency type '{dependency}' for verb '{verb}'")]
    MalformedEvent { verb: String, dependency: String },
    #[error("event has an empty {0} field")]
    EmptyField(&'static str),
}

/// Grammatical relation of an argument to its verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dependency {
    Subject,
    DirectObject,
    IndirectObject,
    PrepositionalObject,
}

/// Which count table a dependency contributes to. All object kinds
/// share a single table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Subject,
    Object,
}

impl Dependency {
    pub fn role(&self) -> Role {
        match self {
            Self::Subject => Role::Subject,
            Self::DirectObject | Self::IndirectObject | Self::PrepositionalObject => Role::Object,
        }
    }

    /// Canonical name, as written to event streams.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::DirectObject => "direct_object",
            Self::IndirectObject => "indirect_object",
            Self::PrepositionalObject => "prepositional_object",
        }
    }

    /// Parse a canonical name or a dependency-parser label.
    ///
    /// Parser labels: `nsubj`/`nsubjpass` are subjects, `dobj`/`obj` direct
    /// objects, `iobj` indirect objects, `pobj` prepositional objects.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "subject" | "nsubj" | "nsubjpass" => Some(Self::Subject),
            "direct_object" | "dobj" | "obj" => Some(Self::DirectObject),
            "indirect_object" | "iobj" => Some(Self::IndirectObject),
            "prepositional_object" | "pobj" => Some(Self::PrepositionalObject),
            _ => None,
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dependency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| s.to_string())
    }
}

/// A validated (verb, argument, dependency) triple.
///
/// Deserialization goes through [`RawEvent::validate`], so events read from
/// RON are lowercased and accept parser labels like any streamed event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawEvent", into = "RawEvent")]
pub struct Event {
    pub verb: String,
    pub argument: String,
    pub dependency: Dependency,
}

impl Event {
    pub fn new(verb: &str, argument: &str, dependency: Dependency) -> Self {
        Self {
            verb: verb.to_lowercase(),
            argument: argument.to_lowercase(),
            dependency,
        }
    }

    /// The statistical unit this event belongs to.
    ///
    /// NOTE: the argument is discarded here. Two events that differ only in
    /// their argument map to the same key, even though the frequency tables
    /// still track arguments individually. `Event`'s own equality is
    /// untouched and still compares all three fields.
    pub fn key(&self) -> EventKey {
        EventKey {
            verb: self.verb.clone(),
            dependency: Some(self.dependency),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.verb, self.argument, self.dependency)
    }
}

/// Equivalence class of events used by the probability estimates:
/// (verb, dependency), with the argument collapsed.
///
/// A `None` dependency stands for "any role", the form used for candidate
/// next-events during prediction. The current estimates only read the verb.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub verb: String,
    pub dependency: Option<Dependency>,
}

impl EventKey {
    pub fn new(verb: &str, dependency: Dependency) -> Self {
        Self {
            verb: verb.to_lowercase(),
            dependency: Some(dependency),
        }
    }

    /// The "(verb, any, any)" form.
    pub fn verb_only(verb: &str) -> Self {
        Self {
            verb: verb.to_lowercase(),
            dependency: None,
        }
    }
}

/// An unvalidated triple as supplied by the annotation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub verb: String,
    pub argument: String,
    pub dependency: String,
}

impl RawEvent {
    pub fn new(verb: &str, argument: &str, dependency: &str) -> Self {
        Self {
            verb: verb.to_string(),
            argument: argument.to_string(),
            dependency: dependency.to_string(),
        }
    }

    /// Check the role label and normalise verb and argument to lowercase.
    pub fn validate(&self) -> Result<Event, EventError> {
        let verb = self.verb.trim();
        let argument = self.argument.trim();
        if verb.is_empty() {
            return Err(EventError::EmptyField("verb"));
        }
        if argument.is_empty() {
            return Err(EventError::EmptyField("argument"));
        }
        let dependency: Dependency = self.dependency.parse().map_err(|dependency| {
            EventError::MalformedEvent {
                verb: verb.to_string(),
                dependency,
            }
        })?;
        Ok(Event::new(verb, argument, dependency))
    }
}

impl TryFrom<RawEvent> for Event {
    type Error = EventError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        raw.validate()
    }
}

impl From<Event> for RawEvent {
    fn from(event: Event) -> Self {
        Self {
            verb: event.verb,
            argument: event.argument,
            dependency: event.dependency.name().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parser_labels_map_to_dependencies() {
        assert_eq!(Dependency::parse("nsubj"), Some(Dependency::Subject));
        assert_eq!(Dependency::parse("nsubjpass"), Some(Dependency::Subject));
        assert_eq!(Dependency::parse("dobj"), Some(Dependency::DirectObject));
        assert_eq!(Dependency::parse("obj"), Some(Dependency::DirectObject));
        assert_eq!(Dependency::parse("iobj"), Some(Dependency::IndirectObject));
        assert_eq!(Dependency::parse("pobj"), Some(Dependency::PrepositionalObject));
        assert_eq!(Dependency::parse("Subject"), Some(Dependency::Subject));
        assert_eq!(Dependency::parse("amod"), None);
    }

    #[test]
    fn roles_group_objects() {
        assert_eq!(Dependency::Subject.role(), Role::Subject);
        assert_eq!(Dependency::DirectObject.role(), Role::Object);
        assert_eq!(Dependency::IndirectObject.role(), Role::Object);
        assert_eq!(Dependency::PrepositionalObject.role(), Role::Object);
    }

    #[test]
    fn validate_normalises_case() {
        let event = RawEvent::new("Buy", "Stock", "dobj").validate().unwrap();
        assert_eq!(event.verb, "buy");
        assert_eq!(event.argument, "stock");
        assert_eq!(event.dependency, Dependency::DirectObject);
    }

    #[test]
    fn validate_rejects_unknown_role() {
        let err = RawEvent::new("buy", "stock", "advmod").validate().unwrap_err();
        assert!(matches!(err, EventError::MalformedEvent { ref dependency, .. } if dependency == "advmod"));
    }

    #[test]
    fn validate_rejects_empty_fields() {
        assert_eq!(
            RawEvent::new("  ", "stock", "dobj").validate(),
            Err(EventError::EmptyField("verb"))
        );
        assert_eq!(
            RawEvent::new("buy", "", "dobj").validate(),
            Err(EventError::EmptyField("argument"))
        );
    }

    #[test]
    fn ron_events_are_validated() {
        let event: Event =
            ron::from_str(r#"(verb: "Buy", argument: "Stock", dependency: "dobj")"#).unwrap();
        assert_eq!(event, Event::new("buy", "stock", Dependency::DirectObject));

        let bad: Result<Event, _> =
            ron::from_str(r#"(verb: "buy", argument: "stock", dependency: "advmod")"#);
        assert!(bad.is_err());

        let written = ron::to_string(&event).unwrap();
        assert!(written.contains("\"direct_object\""));
        assert_eq!(ron::from_str::<Event>(&written).unwrap(), event);
    }

    #[test]
    fn key_collapses_argument() {
        let a = Event::new("buy", "stock", Dependency::DirectObject);
        let b = Event::new("buy", "house", Dependency::DirectObject);
        assert_ne!(a, b);
        assert_eq!(a.key(), b.key());

        let c = Event::new("buy", "stock", Dependency::Subject);
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn verb_only_key_has_no_role() {
        let key = EventKey::verb_only("Sell");
        assert_eq!(key.verb, "sell");
        assert!(key.dependency.is_none());
    }
}
