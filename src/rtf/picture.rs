//! RTF picture extraction.
//!
//! `{\pict ...}` groups carry image metadata as control words and the image
//! itself either as hex digits or as a `\bin` payload. [`PictureBuilder`]
//! accumulates both while the parser walks the group and produces a
//! [`Picture`] when the group closes.

use crate::common::encoding::hex_nibble;

/// Image type in RTF documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageType {
    /// Enhanced Metafile
    Emf,
    /// Windows Metafile
    Wmf,
    /// PNG image
    Png,
    /// JPEG image
    Jpeg,
    /// DIB (Device Independent Bitmap)
    Dib,
    /// Device-dependent Windows bitmap
    Bitmap,
    /// Mac PICT format
    Pict,
    /// OS/2 metafile
    Os2Metafile,
    /// Unknown or unsupported format
    #[default]
    Unknown,
}

impl ImageType {
    /// Short lowercase name, used as the template argument of `picture`.
    pub fn name(self) -> &'static str {
        match self {
            ImageType::Emf => "emf",
            ImageType::Wmf => "wmf",
            ImageType::Png => "png",
            ImageType::Jpeg => "jpeg",
            ImageType::Dib => "dib",
            ImageType::Bitmap => "bmp",
            ImageType::Pict => "pict",
            ImageType::Os2Metafile => "os2-metafile",
            ImageType::Unknown => "unknown",
        }
    }
}

/// Size or scaling property of a picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureProp {
    Width,
    Height,
    GoalWidth,
    GoalHeight,
    ScaleX,
    ScaleY,
}

/// Extracted picture from an RTF document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Picture {
    /// Image type
    pub image_type: ImageType,
    /// Decoded image data
    pub data: Vec<u8>,
    /// Picture width (in pixels or metafile units)
    pub width: Option<i32>,
    /// Picture height
    pub height: Option<i32>,
    /// Goal width (desired width in twips)
    pub goal_width: Option<i32>,
    /// Goal height (desired height in twips)
    pub goal_height: Option<i32>,
    /// Horizontal scaling percentage
    pub scale_x: Option<i32>,
    /// Vertical scaling percentage
    pub scale_y: Option<i32>,
}

impl Picture {
    /// Get the image data as a byte slice.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Accumulates one `{\pict}` group.
#[derive(Debug, Default)]
pub(crate) struct PictureBuilder {
    picture: Picture,
    pending_nibble: Option<u8>,
}

impl PictureBuilder {
    pub(crate) fn set_type(&mut self, image_type: ImageType) {
        self.picture.image_type = image_type;
    }

    pub(crate) fn set_prop(&mut self, prop: PictureProp, value: i32) {
        let slot = match prop {
            PictureProp::Width => &mut self.picture.width,
            PictureProp::Height => &mut self.picture.height,
            PictureProp::GoalWidth => &mut self.picture.goal_width,
            PictureProp::GoalHeight => &mut self.picture.goal_height,
            PictureProp::ScaleX => &mut self.picture.scale_x,
            PictureProp::ScaleY => &mut self.picture.scale_y,
        };
        *slot = Some(value);
    }

    /// Feed hex digits. Whitespace and stray bytes are skipped; a digit pair
    /// may straddle calls.
    pub(crate) fn push_hex(&mut self, text: &[u8]) {
        for nibble in text.iter().copied().filter_map(hex_nibble) {
            match self.pending_nibble.take() {
                Some(high) => self.picture.data.push((high << 4) | nibble),
                None => self.pending_nibble = Some(nibble),
            }
        }
    }

    /// Feed a raw `\bin` payload.
    pub(crate) fn push_binary(&mut self, payload: &[u8]) {
        self.picture.data.extend_from_slice(payload);
    }

    /// Finish the picture, sniffing the format from the data when no blip
    /// keyword named it.
    pub(crate) fn finish(self) -> Picture {
        let mut picture = self.picture;
        if picture.image_type == ImageType::Unknown {
            picture.image_type = detect_image_type(&picture.data);
        }
        picture
    }
}

/// Detect image type from binary signature.
///
/// # Arguments
///
/// * `data` - Binary image data
///
/// # Returns
///
/// Detected image type or Unknown
pub fn detect_image_type(data: &[u8]) -> ImageType {
    if data.is_empty() {
        return ImageType::Unknown;
    }

    // Check JPEG signature (starts with FFD8)
    if data.starts_with(&[0xFF, 0xD8]) {
        return ImageType::Jpeg;
    }

    // Check PNG signature
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return ImageType::Png;
    }

    // EMF header record with " EMF" marker at offset 40
    if data.len() >= 44 && data[0..4] == [0x01, 0x00, 0x00, 0x00] && data[40..44] == *b" EMF" {
        return ImageType::Emf;
    }

    // Aldus Placeable Metafile
    if data.starts_with(&[0xD7, 0xCD, 0xC6, 0x9A]) {
        return ImageType::Wmf;
    }

    // "BM"
    if data.starts_with(b"BM") {
        return ImageType::Dib;
    }

    ImageType::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_png() {
        let png_sig = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(detect_image_type(&png_sig), ImageType::Png);
    }

    #[test]
    fn test_detect_jpeg() {
        let jpeg_sig = vec![0xFF, 0xD8, 0xFF, 0xE0];
        assert_eq!(detect_image_type(&jpeg_sig), ImageType::Jpeg);
    }

    #[test]
    fn test_builder_hex_across_chunks() {
        let mut builder = PictureBuilder::default();
        builder.push_hex(b"89 5");
        builder.push_hex(b"04e\n470d0a1a0a");
        let picture = builder.finish();
        assert_eq!(
            picture.data,
            vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]
        );
        // Sniffed because no blip keyword was given
        assert_eq!(picture.image_type, ImageType::Png);
    }

    #[test]
    fn test_builder_keeps_declared_type() {
        let mut builder = PictureBuilder::default();
        builder.set_type(ImageType::Wmf);
        builder.set_prop(PictureProp::GoalWidth, 720);
        builder.push_binary(&[0xFF, 0xD8]);
        let picture = builder.finish();
        assert_eq!(picture.image_type, ImageType::Wmf);
        assert_eq!(picture.goal_width, Some(720));
        assert_eq!(picture.data(), &[0xFF, 0xD8]);
    }
}
