use std::path::Path;

use image::ImageError;
use lumen_core::{EngineError, ImageSource, Pending};

/// Decode a PNG or JPEG file into an RGBA8 [`ImageSource`].
pub fn load_image_file(path: &Path) -> Result<ImageSource, EngineError> {
    let decoded = image::open(path).map_err(|e| match e {
        ImageError::IoError(source) => EngineError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => EngineError::Image {
            path: path.to_path_buf(),
            msg: other.to_string(),
        },
    })?;
    let rgba = decoded.into_rgba8();
    let (w, h) = rgba.dimensions();
    let img = ImageSource::from_rgba(w, h, rgba.into_raw()).map_err(|e| EngineError::Image {
        path: path.to_path_buf(),
        msg: e.to_string(),
    })?;
    tracing::debug!(path = %path.display(), width = w, height = h, "image decoded");
    Ok(img)
}

/// [`load_image_file`] on a background thread.
pub fn load_image_async(path: &Path) -> Pending<ImageSource> {
    let p = path.to_path_buf();
    Pending::spawn(format!("image {}", p.display()), move || load_image_file(&p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::PendingPoll;
    use std::time::{Duration, Instant};

    #[test]
    fn png_round_trips_into_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dot.png");
        let mut img = image::RgbaImage::new(3, 2);
        img.put_pixel(2, 1, image::Rgba([10, 20, 30, 255]));
        img.save(&path).unwrap();

        let src = load_image_file(&path).unwrap();
        assert_eq!(src.dimensions(), (3, 2));
        let last = &src.pixels()[src.byte_len() - 4..];
        assert_eq!(last, &[10, 20, 30, 255]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_image_file(Path::new("/no/such/image.png")).unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }), "{err}");
    }

    #[test]
    fn garbage_is_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let err = load_image_file(&path).unwrap_err();
        assert!(matches!(err, EngineError::Image { .. }), "{err}");
    }

    #[test]
    fn async_load_resolves_on_a_later_poll() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        image::RgbaImage::new(4, 4).save(&path).unwrap();

        let pending = load_image_async(&path);
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match pending.poll() {
                PendingPoll::Done(r) => {
                    assert_eq!(r.unwrap().dimensions(), (4, 4));
                    break;
                }
                PendingPoll::NotReady => {
                    assert!(Instant::now() < deadline, "image load never finished");
                    std::thread::sleep(Duration::from_millis(2));
                }
            }
        }
    }
}
