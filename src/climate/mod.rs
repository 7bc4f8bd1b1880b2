// src/climate/mod.rs
//! Модель `climate.txt`
//!
//! Файл климатов перечисляет для каждого климата два блока с одинаковым именем:
//!
//! ```text
//! arctic_climate = {
//!     farm_rgo_size = -0.5
//!     max_attrition = 4
//! }
//! arctic_climate = {
//!     1 2 3
//! }
//! ```
//!
//! Первый блок — модификаторы климата, второй — список провинций. Текст
//! разбирается `jomini` в дерево токенов, а [`ClimateModel`] собирается его обходом.
//!
//! ## Повторные объявления
//!
//! Поведение задаёт [`DuplicatePolicy`](crate::config::DuplicatePolicy):
//! - `LastWriteWins` — последний блок заменяет предыдущий, в лог пишется предупреждение
//! - `Reject` — повтор, как и список провинций без модификаторов, является ошибкой

pub mod modifiers;
mod structure;
mod visitor;

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use jomini::TextTape;
use jomini::text::Operator;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ClimateSettings, TextEncoding};
use visitor::ClimateVisitor;

pub use modifiers::{Modifier, ModifierSet, ModifierValue};

/// Ошибки загрузки модели климатов
#[derive(Error, Debug)]
pub enum ClimateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Semantic error: {0}")]
    Semantic(#[from] SemanticError),
}

/// Текст не является корректным скриптом Paradox
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("{0}")]
    Syntax(#[from] jomini::Error),
    #[error("Block opened on line {line} is never closed")]
    UnclosedBlock { line: usize },
    #[error("Closing brace on line {line} has no matching block")]
    UnexpectedClose { line: usize },
    #[error("Quoted string starting on line {line} is never closed")]
    UnterminatedQuote { line: usize },
}

/// Синтаксически корректный, но бессмысленный файл климатов
#[derive(Error, Debug)]
pub enum SemanticError {
    #[error("Climate {climate} declares its modifiers more than once")]
    DuplicateModifiers { climate: String },
    #[error("Climate {climate} declares its provinces more than once")]
    DuplicateProvinces { climate: String },
    #[error("Provinces are listed for undeclared climate {climate}")]
    UndeclaredClimate { climate: String },
    #[error("Expected a block after {name}, found {value:?}")]
    UnexpectedScalar { name: String, value: String },
    #[error("Modifier {modifier} of climate {climate} must be a scalar")]
    NestedModifier { climate: String, modifier: String },
    #[error("Climate {climate} lists {value:?}, which is not a province id")]
    InvalidProvince { climate: String, value: String },
    #[error("Unsupported operator {operator:?} after {name}")]
    UnsupportedOperator { name: String, operator: Operator },
    #[error("Climate {climate} mixes modifiers and provinces in one block")]
    MixedBlock { climate: String },
}

/// Климаты мода: модификаторы и провинции по имени климата
///
/// Неизменяема после построения. Имена климатов не сверяются ни с какими другими
/// данными, только между двумя блоками одного файла.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClimateModel {
    climate_modifiers: HashMap<String, ModifierSet>,
    climate_provinces: HashMap<String, Vec<u32>>,
}

impl ClimateModel {
    /// Собирает модель из уже разобранного дерева
    ///
    /// Парность скобок здесь не проверяется: `jomini` молча закрывает
    /// оборванные блоки, поэтому для текста лучше [`ClimateModel::from_slice`].
    pub fn from_tape(
        tape: &TextTape<'_>,
        settings: &ClimateSettings,
    ) -> Result<Self, ClimateError> {
        let visitor = ClimateVisitor::new(settings);
        let model = match settings.encoding {
            TextEncoding::Windows1252 => visitor.visit_climate(&tape.windows1252_reader())?,
            TextEncoding::Utf8 => visitor.visit_climate(&tape.utf8_reader())?,
        };
        debug!(
            "Loaded {} climates ({:?} duplicates)",
            model.climate_modifiers.len(),
            settings.duplicates
        );
        Ok(model)
    }

    /// Разбирает текст и собирает модель
    ///
    /// # Ошибки
    /// [`ClimateError::Parse`] для синтаксически неверного текста (например, незакрытого блока),
    /// [`ClimateError::Semantic`] для неверной структуры.
    pub fn from_slice(data: &[u8], settings: &ClimateSettings) -> Result<Self, ClimateError> {
        structure::check_structure(data)?;
        let tape = TextTape::from_slice(data).map_err(ParseError::from)?;
        Self::from_tape(&tape, settings)
    }

    /// Читает поток целиком и собирает модель
    pub fn from_reader<R: Read>(
        mut reader: R,
        settings: &ClimateSettings,
    ) -> Result<Self, ClimateError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_slice(&data, settings)
    }

    /// Загружает модель из файла
    pub fn from_file(
        path: impl AsRef<Path>,
        settings: &ClimateSettings,
    ) -> Result<Self, ClimateError> {
        let path = path.as_ref();
        debug!("Reading climates from {}", path.display());
        let data = fs::read(path)?;
        Self::from_slice(&data, settings)
    }

    /// Разбор с настройками по умолчанию
    pub fn parse(data: &[u8]) -> Result<Self, ClimateError> {
        Self::from_slice(data, &ClimateSettings::default())
    }

    #[must_use]
    pub fn modifiers(&self, climate: &str) -> Option<&ModifierSet> {
        self.climate_modifiers.get(climate)
    }

    #[must_use]
    pub fn provinces(&self, climate: &str) -> Option<&[u32]> {
        self.climate_provinces.get(climate).map(Vec::as_slice)
    }

    #[must_use]
    pub fn climate_modifiers(&self) -> &HashMap<String, ModifierSet> {
        &self.climate_modifiers
    }

    #[must_use]
    pub fn climate_provinces(&self) -> &HashMap<String, Vec<u32>> {
        &self.climate_provinces
    }

    /// Имена всех объявленных климатов в алфавитном порядке
    #[must_use]
    pub fn climate_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .climate_modifiers
            .keys()
            .chain(self.climate_provinces.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Количество климатов, упомянутых хотя бы в одном блоке
    #[must_use]
    pub fn len(&self) -> usize {
        self.climate_names().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.climate_modifiers.is_empty() && self.climate_provinces.is_empty()
    }

    /// Выгружает модель в JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
