use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

use crate::images::repo_types::Image;

/// Characters escaped in a single URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

#[derive(Debug, Deserialize)]
pub struct NextImageQuery {
    pub user: i64,
}

/// Either an assignment or `{"done": true}` once the pool is exhausted.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum NextImageResponse {
    Assigned { id: i64, filename: String, url: String },
    Done { done: bool },
}

impl NextImageResponse {
    pub fn assigned(image: Image, url_prefix: &str) -> Self {
        let url = format!(
            "{}/{}",
            url_prefix.trim_end_matches('/'),
            utf8_percent_encode(&image.filename, SEGMENT)
        );
        Self::Assigned {
            id: image.id,
            filename: image.filename,
            url,
        }
    }

    pub fn done() -> Self {
        Self::Done { done: true }
    }
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    fn url_of(filename: &str) -> String {
        let image = Image {
            id: 1,
            filename: filename.into(),
        };
        match NextImageResponse::assigned(image, "/images/") {
            NextImageResponse::Assigned { url, .. } => url,
            NextImageResponse::Done { .. } => unreachable!(),
        }
    }

    #[test]
    fn plain_filename_is_untouched() {
        assert_eq!(url_of("IMG_0001.jpg"), "/images/IMG_0001.jpg");
    }

    #[test]
    fn reserved_characters_are_escaped() {
        assert_eq!(url_of("bay 3 #2?.jpg"), "/images/bay%203%20%232%3F.jpg");
        assert_eq!(url_of("100%.png"), "/images/100%25.png");
        assert_eq!(url_of("a/b.jpg"), "/images/a%2Fb.jpg");
    }

    #[test]
    fn done_serializes_as_flag() {
        let json = serde_json::to_value(NextImageResponse::done()).unwrap();
        assert_eq!(json, serde_json::json!({ "done": true }));
    }
}
