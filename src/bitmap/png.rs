// src/bitmap/png.rs
//! Обратная выгрузка растра в изображение
//!
//! Нужна для отображения карты и отладки: растр превращается в `RgbImage`,
//! который можно показать или сохранить в PNG. Цвета берутся через тот же кэш,
//! что и [`PixelGrid::color_at`], поэтому выгрузка заодно прогревает его.

use std::path::Path;

use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};
use log::debug;

use crate::bitmap::{BitmapError, PixelGrid};

impl PixelGrid {
    /// Преобразует растр в RGB-изображение того же размера
    ///
    /// Пиксель `(x, y)` изображения соответствует координате `(row = y, col = x)`.
    #[must_use]
    pub fn to_rgb_image(&self) -> RgbImage {
        let row_len = self.width() as usize;
        ImageBuffer::from_fn(self.width(), self.height(), |x, y| {
            let color = self.color_at_offset((x as usize + y as usize * row_len) * 3);
            Rgb([color.red, color.green, color.blue])
        })
    }

    /// Сохраняет растр в PNG-файл
    ///
    /// # Ошибки
    /// Возвращает ошибку, если файл невозможно создать или записать.
    pub fn save_as_png(&self, path: impl AsRef<Path>) -> Result<(), BitmapError> {
        let path = path.as_ref();
        debug!("Saving {}×{} bitmap to {}", self.width(), self.height(), path.display());
        self.to_rgb_image().save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}
