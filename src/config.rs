// src/config.rs
//! Настройки загрузчиков карт
//!
//! Этот модуль определяет параметры, управляющие чтением исходных файлов мода:
//! - Настройки растра провинций (ёмкость кэша цветов)
//! - Настройки разбора `climate.txt` (политика дубликатов, кодировка)
//!
//! Все структуры поддерживают сериализацию в TOML/JSON для удобной настройки через конфигурационные файлы.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Ошибки чтения файла настроек
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Настройки загрузки растра
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BitmapSettings {
    /// Начальная ёмкость кэша цветов (число различных цветов, под которое заранее выделяется память)
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_cache_capacity() -> usize {
    1000
}

impl Default for BitmapSettings {
    fn default() -> Self {
        Self {
            cache_capacity: 1000,
        }
    }
}

/// Что делать, если климат объявлен повторно
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Последнее объявление заменяет предыдущее (с предупреждением в лог)
    #[default]
    LastWriteWins,
    /// Повтор — ошибка; список провинций без объявленного климата — тоже ошибка
    Reject,
}

/// Кодировка текстовых файлов мода
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum TextEncoding {
    /// Windows-1252 — кодировка файлов игры
    #[default]
    Windows1252,
    Utf8,
}

/// Настройки разбора `climate.txt`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClimateSettings {
    /// Политика повторных объявлений (по умолчанию `LastWriteWins`)
    #[serde(default)]
    pub duplicates: DuplicatePolicy,

    /// Кодировка файла (по умолчанию `Windows1252`)
    #[serde(default)]
    pub encoding: TextEncoding,
}

/// Полный набор настроек загрузчиков
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LoaderSettings {
    #[serde(default)]
    pub bitmap: BitmapSettings,

    #[serde(default)]
    pub climate: ClimateSettings,
}

impl LoaderSettings {
    /// Загружает настройки из TOML-файла
    ///
    /// # Ошибки
    /// Возвращает ошибку, если файл не найден или содержит недопустимый формат.
    ///
    /// # Пример
    /// ```toml
    /// # loader.toml
    /// [bitmap]
    /// cache_capacity = 4096
    ///
    /// [climate]
    /// duplicates = "Reject"
    /// encoding = "Utf8"
    /// ```
    ///
    /// ```rust,no_run
    /// use mapdata::config::LoaderSettings;
    /// let settings = LoaderSettings::from_toml_file("loader.toml")?;
    /// # Ok::<(), mapdata::config::ConfigError>(())
    /// ```
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Разбирает настройки из строки TOML
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(contents)?;
        Ok(settings)
    }
}
