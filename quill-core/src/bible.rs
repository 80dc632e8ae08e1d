//! The story bible: summary, characters and locations.
//!
//! The bible is free-form reference material. Nothing here checks that a
//! character or location named in scene text actually exists.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Generate a fresh opaque identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The canonical story-setting reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bible {
    pub summary: String,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub locations: Vec<Location>,
}

/// A character in the story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub traits: Vec<String>,
    pub arc_status: String,
    pub description: String,
}

/// A place in the story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl Default for Bible {
    fn default() -> Self {
        Self {
            summary: "A cyberpunk noir set in Neo-Tokyo 2099. Detective Kaito investigates a \
                      series of android malfunctions that point to a rogue AI god."
                .to_string(),
            characters: vec![
                Character {
                    id: "1".to_string(),
                    name: "Kaito".to_string(),
                    traits: vec!["Cynical".to_string()],
                    arc_status: "Alive".to_string(),
                    description: "A detective with a cybernetic eye.".to_string(),
                },
                Character {
                    id: "2".to_string(),
                    name: "Aria".to_string(),
                    traits: vec!["Mysterious".to_string()],
                    arc_status: "Alive".to_string(),
                    description: "An android who claims to dream.".to_string(),
                },
            ],
            locations: vec![Location {
                id: "1".to_string(),
                name: "The Neon Bazaar".to_string(),
                description: "A crowded, rain-slicked market.".to_string(),
            }],
        }
    }
}

impl Character {
    /// A blank character as created from the bible editor.
    pub fn placeholder() -> Self {
        Self {
            id: new_id(),
            name: "New Character".to_string(),
            traits: Vec::new(),
            arc_status: "Alive".to_string(),
            description: "Description...".to_string(),
        }
    }

    /// Set one field from its text form.
    pub fn set(&mut self, field: CharacterField, value: &str) {
        match field {
            CharacterField::Name => self.name = value.to_string(),
            CharacterField::Traits => self.traits = parse_traits(value),
            CharacterField::ArcStatus => self.arc_status = value.to_string(),
            CharacterField::Description => self.description = value.to_string(),
        }
    }

    /// Get one field in its text form.
    pub fn get(&self, field: CharacterField) -> String {
        match field {
            CharacterField::Name => self.name.clone(),
            CharacterField::Traits => self.traits.join(", "),
            CharacterField::ArcStatus => self.arc_status.clone(),
            CharacterField::Description => self.description.clone(),
        }
    }
}

impl Location {
    /// A blank location as created from the bible editor.
    pub fn placeholder() -> Self {
        Self {
            id: new_id(),
            name: "New Location".to_string(),
            description: "Description...".to_string(),
        }
    }

    pub fn set(&mut self, field: LocationField, value: &str) {
        match field {
            LocationField::Name => self.name = value.to_string(),
            LocationField::Description => self.description = value.to_string(),
        }
    }

    pub fn get(&self, field: LocationField) -> String {
        match field {
            LocationField::Name => self.name.clone(),
            LocationField::Description => self.description.clone(),
        }
    }
}

/// Split a comma-separated trait list, trimming each entry.
pub fn parse_traits(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Editable character fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterField {
    Name,
    Traits,
    ArcStatus,
    Description,
}

impl CharacterField {
    pub const ALL: [CharacterField; 4] = [
        CharacterField::Name,
        CharacterField::Traits,
        CharacterField::ArcStatus,
        CharacterField::Description,
    ];
}

impl fmt::Display for CharacterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CharacterField::Name => "name",
            CharacterField::Traits => "traits",
            CharacterField::ArcStatus => "arc",
            CharacterField::Description => "description",
        };
        f.write_str(s)
    }
}

impl FromStr for CharacterField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(CharacterField::Name),
            "traits" | "trait" => Ok(CharacterField::Traits),
            "arc" | "arcstatus" | "status" => Ok(CharacterField::ArcStatus),
            "description" | "desc" => Ok(CharacterField::Description),
            other => Err(format!("unknown character field '{other}'")),
        }
    }
}

/// Editable location fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationField {
    Name,
    Description,
}

impl LocationField {
    pub const ALL: [LocationField; 2] = [LocationField::Name, LocationField::Description];
}

impl fmt::Display for LocationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LocationField::Name => "name",
            LocationField::Description => "description",
        })
    }
}

impl FromStr for LocationField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(LocationField::Name),
            "description" | "desc" => Ok(LocationField::Description),
            other => Err(format!("unknown location field '{other}'")),
        }
    }
}

impl Bible {
    /// Add a placeholder character and return its id.
    pub fn add_character(&mut self) -> String {
        let character = Character::placeholder();
        let id = character.id.clone();
        self.characters.push(character);
        id
    }

    /// Update a character field. Returns false if the id is unknown.
    pub fn update_character(&mut self, id: &str, field: CharacterField, value: &str) -> bool {
        match self.characters.iter_mut().find(|c| c.id == id) {
            Some(character) => {
                character.set(field, value);
                true
            }
            None => false,
        }
    }

    /// Remove a character. Returns false if the id is unknown.
    pub fn delete_character(&mut self, id: &str) -> bool {
        let before = self.characters.len();
        self.characters.retain(|c| c.id != id);
        self.characters.len() != before
    }

    pub fn character(&self, id: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    /// Add a placeholder location and return its id.
    pub fn add_location(&mut self) -> String {
        let location = Location::placeholder();
        let id = location.id.clone();
        self.locations.push(location);
        id
    }

    pub fn update_location(&mut self, id: &str, field: LocationField, value: &str) -> bool {
        match self.locations.iter_mut().find(|l| l.id == id) {
            Some(location) => {
                location.set(field, value);
                true
            }
            None => false,
        }
    }

    pub fn delete_location(&mut self, id: &str) -> bool {
        let before = self.locations.len();
        self.locations.retain(|l| l.id != id);
        self.locations.len() != before
    }

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }
}
