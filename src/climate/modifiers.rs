use std::fmt;

use serde::{Deserialize, Serialize};

/// Значение модификатора: число или произвольный токен (`yes`, идентификатор и т.д.)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModifierValue {
    Number(f64),
    Text(String),
}

impl ModifierValue {
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ModifierValue::Number(n) => Some(*n),
            ModifierValue::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ModifierValue::Number(_) => None,
            ModifierValue::Text(s) => Some(s),
        }
    }
}

impl From<f64> for ModifierValue {
    fn from(value: f64) -> Self {
        ModifierValue::Number(value)
    }
}

impl From<&str> for ModifierValue {
    fn from(value: &str) -> Self {
        ModifierValue::Text(value.to_string())
    }
}

impl fmt::Display for ModifierValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModifierValue::Number(n) => write!(f, "{n}"),
            ModifierValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub name: String,
    pub value: ModifierValue,
}

/// Упорядоченный набор модификаторов одного климата
///
/// Порядок совпадает с порядком в файле. Повторное имя заменяет значение на прежнем месте.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModifierSet {
    modifiers: Vec<Modifier>,
}

impl ModifierSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавляет модификатор; если имя уже есть, возвращает прежнее значение
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ModifierValue>,
    ) -> Option<ModifierValue> {
        let name = name.into();
        let value = value.into();
        match self.modifiers.iter_mut().find(|m| m.name == name) {
            Some(existing) => Some(std::mem::replace(&mut existing.value, value)),
            None => {
                self.modifiers.push(Modifier { name, value });
                None
            }
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ModifierValue> {
        self.modifiers
            .iter()
            .find(|m| m.name == name)
            .map(|m| &m.value)
    }

    /// Числовое значение модификатора, если он есть и является числом
    #[must_use]
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ModifierValue::as_number)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Modifier> {
        self.modifiers.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }
}

impl<S, V> FromIterator<(S, V)> for ModifierSet
where
    S: Into<String>,
    V: Into<ModifierValue>,
{
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        let mut set = ModifierSet::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ModifierSet {
    type Item = &'a Modifier;
    type IntoIter = std::slice::Iter<'a, Modifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_file_order() {
        let set: ModifierSet = [("b", 1.0), ("a", 2.0), ("c", 3.0)].into_iter().collect();
        let names: Vec<&str> = set.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn reinsert_replaces_in_place() {
        let mut set = ModifierSet::new();
        set.insert("farm_rgo_size", 0.1);
        set.insert("mine_rgo_size", -0.2);
        let previous = set.insert("farm_rgo_size", 0.5);

        assert_eq!(previous, Some(ModifierValue::Number(0.1)));
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().next().unwrap().name, "farm_rgo_size");
        assert_eq!(set.number("farm_rgo_size"), Some(0.5));
    }

    #[test]
    fn text_values() {
        let mut set = ModifierSet::new();
        set.insert("snow", "yes");
        assert_eq!(set.get("snow").and_then(ModifierValue::as_text), Some("yes"));
        assert_eq!(set.number("snow"), None);
        assert_eq!(set.get("rain"), None);
    }

    #[test]
    fn serializes_as_list() {
        let set: ModifierSet = [("temp", -10.0)].into_iter().collect();
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, serde_json::json!([{ "name": "temp", "value": -10.0 }]));
    }
}
