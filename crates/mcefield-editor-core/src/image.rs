//! Image resize side-channel.
//!
//! A resized image is re-requested from the server at the new width, starting
//! from the original file rather than the current variant.

use serde::Deserialize;

/// Body returned by the resize endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResizeResponse {
    pub src: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// Source URL of the original image for a (possibly resized) variant URL.
///
/// `path/name.300x200-is-hidpi.jpg` becomes `path/name.jpg`. Cropped
/// variants (`-cropx` / `.cropx`) are returned unchanged.
pub fn original_src(src: &str) -> String {
    let split = src.rfind('/').map_or(0, |i| i + 1);
    let (path, basename) = src.split_at(split);
    if basename.contains("-cropx") || basename.contains(".cropx") {
        return src.to_owned();
    }
    match (basename.find('.'), basename.rfind('.')) {
        (Some(first), Some(last)) if first != last => {
            format!("{path}{}{}", &basename[..first], &basename[last..])
        }
        _ => src.to_owned(),
    }
}

/// Does the image class list ask for a high-density variant?
pub fn is_hidpi(class_name: &str) -> bool {
    class_name.contains("hidpi")
}

/// URL of the resize request for an image.
pub fn resize_url(admin_url: &str, src: &str, width: u32, hidpi: bool) -> String {
    format!(
        "{admin_url}page/image/resize?json=1&width={width}&hidpi={}&file={}",
        u8::from(hidpi),
        original_src(src)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_variant_suffix() {
        assert_eq!(
            original_src("/site/assets/files/1/photo.300x200-is-hidpi.jpg"),
            "/site/assets/files/1/photo.jpg"
        );
        assert_eq!(
            original_src("/site/assets/files/1/photo.jpg"),
            "/site/assets/files/1/photo.jpg"
        );
        assert_eq!(original_src("photo.0x100.png"), "photo.png");
    }

    #[test]
    fn cropped_variants_are_left_alone() {
        let src = "/files/1/gonzo_the_great.205x183-cropx38y2-is.jpg";
        assert_eq!(original_src(src), src);
    }

    #[test]
    fn builds_resize_request() {
        insta::assert_snapshot!(
            resize_url("/processwire/", "/files/1/a.100x0.jpg", 240, is_hidpi("align_left hidpi")),
            @"/processwire/page/image/resize?json=1&width=240&hidpi=1&file=/files/1/a.jpg"
        );
    }
}
