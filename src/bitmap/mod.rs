// src/bitmap/mod.rs
//! Растровые карты провинций (`provinces.bmp`, `terrain.bmp`)
//!
//! Модуль загружает изображение в память и отдаёт цвет любого пикселя по
//! координате `(row, col)`:
//! - Сырой буфер хранится как есть: по 3 байта на пиксель, строки подряд, без выравнивания
//! - Порядок каналов задаётся [`ChannelOrder`] (BMP хранит `B, G, R`)
//! - Цвета создаются лениво и кэшируются по упакованному 24-битному значению
//!
//! ## Пример использования
//! ```rust,no_run
//! use mapdata::bitmap::PixelGrid;
//!
//! let grid = PixelGrid::from_file("map/provinces.bmp")?;
//! for point in &grid {
//!     let color = grid.color_at_point(point)?;
//!     println!("{point:?} → {color}");
//! }
//! # Ok::<(), mapdata::bitmap::BitmapError>(())
//! ```
//!
//! Модуль не знает, какой провинции соответствует цвет: это забота потребителя.

pub mod iter;
pub mod png;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::io::{BufRead, Seek};
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use image::DynamicImage;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BitmapSettings;

pub use iter::GridIter;

/// Ошибки загрузки и чтения растра
#[derive(Error, Debug)]
pub enum BitmapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image decoding error: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Pixel buffer is truncated: expected at least {expected} bytes, got {actual}")]
    TruncatedBuffer { expected: usize, actual: usize },
    #[error("{axis} {value} is out of bounds. Bitmap {} is: {bound}", .axis.dimension())]
    OutOfBounds { axis: Axis, value: u32, bound: u32 },
}

/// Измерение, по которому координата вышла за границы
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Row,
    Column,
}

impl Axis {
    /// Размер растра, ограничивающий это измерение
    #[must_use]
    pub fn dimension(self) -> &'static str {
        match self {
            Axis::Row => "height",
            Axis::Column => "width",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Row => f.write_str("Row"),
            Axis::Column => f.write_str("Column"),
        }
    }
}

/// Координата ячейки: `row` сверху вниз, `col` слева направо
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub row: u32,
    pub col: u32,
}

impl Coordinate {
    #[must_use]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl From<(u32, u32)> for Coordinate {
    fn from((row, col): (u32, u32)) -> Self {
        Self { row, col }
    }
}

impl From<Coordinate> for (u32, u32) {
    fn from(point: Coordinate) -> Self {
        (point.row, point.col)
    }
}

/// Цвет пикселя, по 8 бит на канал
///
/// Сравнивается по значению: одинаковые байты всегда дают равные цвета.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Упакованное значение `0xRRGGBB`, ключ кэша цветов
    #[must_use]
    pub fn packed(self) -> u32 {
        pack(self.red, self.green, self.blue)
    }

    /// Цвет в формате `"#rrggbb"`
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }

    /// Разбирает цвет из строки `"#rrggbb"`
    ///
    /// Возвращает `None` для строк другой длины или с не-шестнадцатеричными символами.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let red = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let green = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let blue = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self::new(red, green, blue))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn pack(red: u8, green: u8, blue: u8) -> u32 {
    u32::from(blue) | (u32::from(green) << 8) | (u32::from(red) << 16)
}

/// Порядок каналов внутри 3-байтовой группы пикселя
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelOrder {
    /// `B, G, R` — раскладка 24-битного BMP
    #[default]
    Bgr,
    /// `R, G, B` — раскладка `image::RgbImage`
    Rgb,
}

impl ChannelOrder {
    /// Раскладывает группу из трёх байт в `(red, green, blue)`
    fn channels(self, group: &[u8]) -> (u8, u8, u8) {
        match self {
            ChannelOrder::Bgr => (group[2], group[1], group[0]),
            ChannelOrder::Rgb => (group[0], group[1], group[2]),
        }
    }
}

/// Растр в памяти с ленивым декодированием цветов
///
/// Буфер неизменяем после создания. Кэш цветов защищён `RwLock`, поэтому
/// `color_at` можно вызывать из нескольких потоков одновременно.
#[derive(Debug)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    order: ChannelOrder,
    data: Vec<u8>,
    cache: RwLock<HashMap<u32, Color>>,
}

impl PixelGrid {
    /// Создаёт растр из готового буфера
    ///
    /// # Ошибки
    /// [`BitmapError::TruncatedBuffer`], если в буфере меньше `width × height × 3` байт.
    pub fn from_raw(
        width: u32,
        height: u32,
        data: Vec<u8>,
        order: ChannelOrder,
    ) -> Result<Self, BitmapError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(3))
            .unwrap_or(usize::MAX);
        if data.len() < expected {
            return Err(BitmapError::TruncatedBuffer {
                expected,
                actual: data.len(),
            });
        }

        debug!("Loaded {width}×{height} bitmap ({order:?}, {} bytes)", data.len());
        let settings = BitmapSettings::default();
        Ok(Self {
            width,
            height,
            order,
            data,
            cache: RwLock::new(HashMap::with_capacity(settings.cache_capacity)),
        })
    }

    /// Создаёт растр из декодированного изображения
    ///
    /// Палитровые и 32-битные изображения приводятся к 8-битному RGB.
    pub fn from_image(image: DynamicImage) -> Result<Self, BitmapError> {
        let rgb = image.into_rgb8();
        let (width, height) = rgb.dimensions();
        Self::from_raw(width, height, rgb.into_raw(), ChannelOrder::Rgb)
    }

    /// Декодирует изображение из файла (формат определяется по расширению и содержимому)
    ///
    /// Ошибка открытия файла приходит от `image` как [`BitmapError::Decode`]
    /// с `ImageError::IoError` внутри.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BitmapError> {
        let path = path.as_ref();
        debug!("Decoding bitmap {}", path.display());
        Self::from_image(image::open(path)?)
    }

    /// Декодирует изображение из потока, формат угадывается по содержимому
    pub fn from_reader<R: BufRead + Seek>(reader: R) -> Result<Self, BitmapError> {
        let image = image::io::Reader::new(reader)
            .with_guessed_format()?
            .decode()?;
        Self::from_image(image)
    }

    /// Декодирует изображение из байтов в памяти
    pub fn from_slice(bytes: &[u8]) -> Result<Self, BitmapError> {
        Self::from_image(image::load_from_memory(bytes)?)
    }

    /// Применяет настройки загрузчика (пока только ёмкость кэша)
    ///
    /// Уже закэшированные цвета сохраняются, кэш лишь резервирует место.
    #[must_use]
    pub fn with_settings(mut self, settings: &BitmapSettings) -> Self {
        let cache = self.cache.get_mut().unwrap_or_else(PoisonError::into_inner);
        cache.reserve(settings.cache_capacity.saturating_sub(cache.len()));
        self
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn channel_order(&self) -> ChannelOrder {
        self.order
    }

    /// Количество пикселей `width × height`
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Количество различных цветов, уже попавших в кэш
    #[must_use]
    pub fn cached_colors(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Возвращает цвет пикселя в строке `row` и столбце `col`
    ///
    /// # Ошибки
    /// [`BitmapError::OutOfBounds`], если `row >= height` или `col >= width`.
    /// Строка проверяется первой. Координаты никогда не обрезаются.
    pub fn color_at(&self, row: u32, col: u32) -> Result<Color, BitmapError> {
        if row >= self.height {
            return Err(BitmapError::OutOfBounds {
                axis: Axis::Row,
                value: row,
                bound: self.height,
            });
        }
        if col >= self.width {
            return Err(BitmapError::OutOfBounds {
                axis: Axis::Column,
                value: col,
                bound: self.width,
            });
        }

        let flat_index = (col as usize + row as usize * self.width as usize) * 3;
        Ok(self.color_at_offset(flat_index))
    }

    /// То же, что [`PixelGrid::color_at`], но для [`Coordinate`]
    pub fn color_at_point(&self, point: Coordinate) -> Result<Color, BitmapError> {
        self.color_at(point.row, point.col)
    }

    /// Новый обход всех координат растра по строкам
    #[must_use]
    pub fn coordinates(&self) -> GridIter {
        GridIter::new(self.width, self.height)
    }

    /// Цвета всех пикселей в порядке обхода по строкам
    #[cfg(feature = "parallel")]
    #[must_use]
    pub fn colors(&self) -> Vec<Color> {
        use rayon::prelude::*;

        (0..self.pixel_count())
            .into_par_iter()
            .map(|pixel| self.color_at_offset(pixel * 3))
            .collect()
    }

    /// Цвета всех пикселей в порядке обхода по строкам
    #[cfg(not(feature = "parallel"))]
    #[must_use]
    pub fn colors(&self) -> Vec<Color> {
        (0..self.pixel_count())
            .map(|pixel| self.color_at_offset(pixel * 3))
            .collect()
    }

    /// Все различные цвета растра, упорядоченные по `(red, green, blue)`
    #[must_use]
    pub fn distinct_colors(&self) -> BTreeSet<Color> {
        self.colors().into_iter().collect()
    }

    /// `flat_index` должен указывать на начало пикселя внутри `width × height × 3`
    fn color_at_offset(&self, flat_index: usize) -> Color {
        let (red, green, blue) = self
            .order
            .channels(&self.data[flat_index..flat_index + 3]);
        let packed = pack(red, green, blue);

        let cached = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&packed)
            .copied();
        if let Some(color) = cached {
            return color;
        }

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        *cache.entry(packed).or_insert_with(|| {
            trace!("Color cache miss for {packed:#08x}");
            Color::new(red, green, blue)
        })
    }
}

impl<'a> IntoIterator for &'a PixelGrid {
    type Item = Coordinate;
    type IntoIter = GridIter;

    fn into_iter(self) -> Self::IntoIter {
        self.coordinates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2×2 растр в BGR: красный, зелёный / синий, белый
    fn four_colors() -> PixelGrid {
        #[rustfmt::skip]
        let data = vec![
            0, 0, 255,    0, 255, 0,
            255, 0, 0,    255, 255, 255,
        ];
        PixelGrid::from_raw(2, 2, data, ChannelOrder::Bgr).unwrap()
    }

    #[test]
    fn reads_bgr_groups_as_rgb() {
        let grid = four_colors();
        assert_eq!(grid.color_at(0, 0).unwrap(), Color::new(255, 0, 0));
        assert_eq!(grid.color_at(0, 1).unwrap(), Color::new(0, 255, 0));
        assert_eq!(grid.color_at(1, 0).unwrap(), Color::new(0, 0, 255));
        assert_eq!(grid.color_at(1, 1).unwrap(), Color::new(255, 255, 255));
    }

    #[test]
    fn rgb_order_reads_bytes_directly() {
        let grid = PixelGrid::from_raw(1, 1, vec![10, 20, 30], ChannelOrder::Rgb).unwrap();
        assert_eq!(grid.color_at(0, 0).unwrap(), Color::new(10, 20, 30));
    }

    #[test]
    fn four_distinct_pixels_fill_four_cache_entries() {
        let grid = four_colors();
        assert_eq!(grid.cached_colors(), 0);
        for point in &grid {
            grid.color_at_point(point).unwrap();
        }
        assert_eq!(grid.cached_colors(), 4);
        assert_eq!(grid.distinct_colors().len(), 4);
    }

    #[test]
    fn settings_keep_cached_colors() {
        let grid = four_colors();
        grid.color_at(0, 0).unwrap();
        grid.color_at(1, 1).unwrap();

        let grid = grid.with_settings(&BitmapSettings { cache_capacity: 64 });
        assert_eq!(grid.cached_colors(), 2);
        assert!(grid.cache.read().unwrap().capacity() >= 64);
        assert_eq!(grid.color_at(0, 0).unwrap(), Color::new(255, 0, 0));
        assert_eq!(grid.cached_colors(), 2);
    }

    #[test]
    fn equal_bytes_share_one_cache_entry() {
        let data = [7, 8, 9].repeat(6);
        let grid = PixelGrid::from_raw(3, 2, data, ChannelOrder::Bgr).unwrap();
        let first = grid.color_at(0, 0).unwrap();
        let last = grid.color_at(1, 2).unwrap();
        assert_eq!(first, last);
        assert_eq!(grid.cached_colors(), 1);
    }

    #[test]
    fn row_out_of_bounds_reports_height() {
        let grid = four_colors();
        let err = grid.color_at(2, 0).unwrap_err();
        assert!(matches!(
            err,
            BitmapError::OutOfBounds {
                axis: Axis::Row,
                value: 2,
                bound: 2
            }
        ));
        assert_eq!(err.to_string(), "Row 2 is out of bounds. Bitmap height is: 2");
    }

    #[test]
    fn column_out_of_bounds_reports_width() {
        let grid = four_colors();
        let err = grid.color_at(0, 5).unwrap_err();
        assert!(matches!(
            err,
            BitmapError::OutOfBounds {
                axis: Axis::Column,
                value: 5,
                bound: 2
            }
        ));
        assert_eq!(err.to_string(), "Column 5 is out of bounds. Bitmap width is: 2");
        // Неудачный запрос не трогает кэш
        assert_eq!(grid.cached_colors(), 0);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let err = PixelGrid::from_raw(2, 2, vec![0; 11], ChannelOrder::Bgr).unwrap_err();
        assert!(matches!(
            err,
            BitmapError::TruncatedBuffer {
                expected: 12,
                actual: 11
            }
        ));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let grid = PixelGrid::from_raw(1, 1, vec![1, 2, 3, 99, 99], ChannelOrder::Bgr).unwrap();
        assert_eq!(grid.color_at(0, 0).unwrap(), Color::new(3, 2, 1));
    }

    #[test]
    fn colors_follow_row_major_order() {
        let grid = four_colors();
        let expected: Vec<Color> = grid
            .coordinates()
            .map(|p| grid.color_at_point(p).unwrap())
            .collect();
        assert_eq!(grid.colors(), expected);
    }

    #[test]
    fn concurrent_lookups_agree() {
        let grid = four_colors();
        let results: Vec<Vec<Color>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| grid.colors()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(grid.cached_colors(), 4);
    }

    #[test]
    fn legacy_channel_recovery_matches_plain_bytes() {
        // Старые формулы: red = (r << 16) / (2 * i16::MAX), green = (g << 8) / 256
        for byte in 0..=255_u8 {
            let shifted_red = i32::from(byte) << 16;
            let shifted_green = i32::from(byte) << 8;
            assert_eq!(shifted_red / (2 * i32::from(i16::MAX)), i32::from(byte));
            assert_eq!(shifted_green / 256, i32::from(byte));
        }
    }

    #[test]
    fn packed_value_is_unique_per_color() {
        assert_eq!(Color::new(0x12, 0x34, 0x56).packed(), 0x12_34_56);
        assert_ne!(
            Color::new(1, 0, 0).packed(),
            Color::new(0, 1, 0).packed()
        );
    }

    #[test]
    fn hex_round_trip() {
        let color = Color::new(0xa1, 0xb2, 0xc3);
        assert_eq!(color.to_hex(), "#a1b2c3");
        assert_eq!(Color::from_hex("#a1b2c3"), Some(color));
        assert_eq!(Color::from_hex("a1b2c3"), None);
        assert_eq!(Color::from_hex("#a1b2"), None);
        assert_eq!(Color::from_hex("#zzzzzz"), None);
    }
}
