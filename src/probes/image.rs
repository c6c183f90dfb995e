use super::{classify, Probe, ProbeContext};
use crate::core::errors::ProbeFailure;
use crate::core::result::{Details, Outcome, ProbeError};
use crate::core::target::TargetDescriptor;
use async_trait::async_trait;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl ImageFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
        }
    }
}

pub fn detect_signature(data: &[u8]) -> Option<ImageFormat> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageFormat::Jpeg)
    } else if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(ImageFormat::Png)
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        Some(ImageFormat::Gif)
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some(ImageFormat::WebP)
    } else {
        None
    }
}

fn has_jpeg_trailer(data: &[u8]) -> bool {
    data.len() >= 4 && data[data.len() - 2] == 0xFF && data[data.len() - 1] == 0xD9
}

fn is_sof(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF)
}

/// Walk the segment list up to the first frame header. Returns the SOF
/// marker byte plus (width, height).
fn jpeg_frame(data: &[u8]) -> Option<(u8, u32, u32)> {
    let mut i = 2;
    while i + 4 <= data.len() {
        if data[i] != 0xFF {
            return None;
        }
        let marker = data[i + 1];
        if marker == 0xFF {
            // fill byte
            i += 1;
            continue;
        }
        if (0xD0..=0xD9).contains(&marker) || marker == 0x01 {
            // standalone marker, no length field
            i += 2;
            continue;
        }
        let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        if len < 2 {
            return None;
        }
        if is_sof(marker) {
            let p = i + 4;
            if p + 5 > data.len() {
                return None;
            }
            let height = u16::from_be_bytes([data[p + 1], data[p + 2]]) as u32;
            let width = u16::from_be_bytes([data[p + 3], data[p + 4]]) as u32;
            return Some((marker, width, height));
        }
        if marker == 0xDA {
            // start of scan without a frame header first
            return None;
        }
        i += 2 + len;
    }
    None
}

fn png_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 24 || &data[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
    let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
    Some((width, height))
}

fn gif_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 10 {
        return None;
    }
    let width = u16::from_le_bytes([data[6], data[7]]) as u32;
    let height = u16::from_le_bytes([data[8], data[9]]) as u32;
    Some((width, height))
}

fn webp_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 30 {
        return None;
    }
    match &data[12..16] {
        b"VP8X" => {
            let width = 1 + u32::from_le_bytes([data[24], data[25], data[26], 0]);
            let height = 1 + u32::from_le_bytes([data[27], data[28], data[29], 0]);
            Some((width, height))
        }
        b"VP8 " => {
            if data[23] != 0x9D || data[24] != 0x01 || data[25] != 0x2A {
                return None;
            }
            let width = (u16::from_le_bytes([data[26], data[27]]) & 0x3FFF) as u32;
            let height = (u16::from_le_bytes([data[28], data[29]]) & 0x3FFF) as u32;
            Some((width, height))
        }
        b"VP8L" => {
            if data[20] != 0x2F {
                return None;
            }
            let bits = u32::from_le_bytes([data[21], data[22], data[23], data[24]]);
            let width = 1 + (bits & 0x3FFF);
            let height = 1 + ((bits >> 14) & 0x3FFF);
            Some((width, height))
        }
        _ => None,
    }
}

async fn fetch_bytes(
    target: &TargetDescriptor,
    ctx: &ProbeContext,
) -> Result<Vec<u8>, ProbeError> {
    let resp = ctx
        .client()
        .get(target.resource_url.clone())
        .timeout(target.probe_timeout)
        .send()
        .await
        .map_err(|e| ProbeError::with_partial(classify(&e, target.probe_timeout), Details::new()))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(ProbeError::with_partial(
            ProbeFailure::Protocol(format!("received status {status}")),
            Details::new(),
        ));
    }
    let body = resp.bytes().await.map_err(|e| {
        ProbeError::with_partial(classify(&e, target.probe_timeout), Details::new())
    })?;
    Ok(body.to_vec())
}

/// Byte-level signature check. A payload that is not an image is a definite
/// finding, so the probe completes with `is_valid_signature=false` instead of
/// failing; only the fetch itself can fail.
pub struct ImageValidity;

#[async_trait]
impl Probe for ImageValidity {
    fn identity(&self) -> &'static str {
        "Image Validity"
    }

    async fn run(&self, target: &TargetDescriptor, ctx: &ProbeContext) -> Outcome {
        let data = fetch_bytes(target, ctx).await?;

        let mut details = Details::new();
        details.insert("content_length".into(), json!(data.len()));

        let format = detect_signature(&data);
        // a JPEG must also carry its end-of-image trailer to count
        let valid = match format {
            Some(ImageFormat::Jpeg) => has_jpeg_trailer(&data),
            Some(_) => true,
            None => false,
        };
        details.insert("is_valid_signature".into(), json!(valid));
        details.insert(
            "detected_format".into(),
            json!(format.map(|f| f.name()).unwrap_or("unknown")),
        );
        Ok(details)
    }
}

/// Structural metadata from the image header: format, dimensions, and for
/// JPEGs whether the encoding is progressive. An unparseable payload is a
/// decode failure.
pub struct ImageMetadata;

#[async_trait]
impl Probe for ImageMetadata {
    fn identity(&self) -> &'static str {
        "Image Metadata"
    }

    async fn run(&self, target: &TargetDescriptor, ctx: &ProbeContext) -> Outcome {
        let data = fetch_bytes(target, ctx).await?;

        let mut details = Details::new();
        details.insert("content_length".into(), json!(data.len()));

        let Some(format) = detect_signature(&data) else {
            return Err(ProbeError::with_partial(
                ProbeFailure::Decode("unrecognized image signature".into()),
                details,
            ));
        };
        details.insert("format".into(), json!(format.name()));

        let dimensions = match format {
            ImageFormat::Jpeg => jpeg_frame(&data).map(|(_, w, h)| (w, h)),
            ImageFormat::Png => png_dimensions(&data),
            ImageFormat::Gif => gif_dimensions(&data),
            ImageFormat::WebP => webp_dimensions(&data),
        };
        let Some((width, height)) = dimensions else {
            return Err(ProbeError::with_partial(
                ProbeFailure::Decode(format!("truncated {} header", format.name())),
                details,
            ));
        };
        details.insert("width".into(), json!(width));
        details.insert("height".into(), json!(height));

        if format == ImageFormat::Jpeg {
            let progressive = jpeg_frame(&data).is_some_and(|(marker, _, _)| marker == 0xC2);
            details.insert("progressive".into(), json!(progressive));
        }
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use url::Url;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Minimal but structurally valid JPEG: SOI, one SOF segment, EOI.
    fn jpeg_bytes(sof_marker: u8, width: u16, height: u16) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        data.extend([0xFF, sof_marker, 0x00, 0x11, 0x08]);
        data.extend(height.to_be_bytes());
        data.extend(width.to_be_bytes());
        data.push(0x03);
        data.extend([0u8; 9]); // component specs
        data.extend([0xFF, 0xD9]);
        data
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        data.extend([0x00, 0x00, 0x00, 0x0D]);
        data.extend(b"IHDR");
        data.extend(width.to_be_bytes());
        data.extend(height.to_be_bytes());
        data.extend([8, 6, 0, 0, 0]);
        data
    }

    #[rstest]
    #[case::jpeg(jpeg_bytes(0xC0, 4, 4), Some(ImageFormat::Jpeg))]
    #[case::png(png_bytes(1, 1), Some(ImageFormat::Png))]
    #[case::gif(b"GIF89a\x10\x00\x08\x00".to_vec(), Some(ImageFormat::Gif))]
    #[case::text(b"definitely not an image".to_vec(), None)]
    #[case::empty(Vec::new(), None)]
    fn signature_detection(#[case] data: Vec<u8>, #[case] expected: Option<ImageFormat>) {
        assert_eq!(detect_signature(&data), expected);
    }

    #[test]
    fn jpeg_frame_reads_dimensions_and_marker() {
        let baseline = jpeg_bytes(0xC0, 640, 480);
        assert_eq!(jpeg_frame(&baseline), Some((0xC0, 640, 480)));

        let progressive = jpeg_bytes(0xC2, 100, 50);
        assert_eq!(jpeg_frame(&progressive), Some((0xC2, 100, 50)));
    }

    #[test]
    fn truncated_jpeg_has_no_frame() {
        let data = vec![0xFF, 0xD8, 0xFF, 0xD9];
        assert_eq!(jpeg_frame(&data), None);
    }

    #[test]
    fn png_and_gif_dimensions() {
        assert_eq!(png_dimensions(&png_bytes(800, 600)), Some((800, 600)));
        assert_eq!(gif_dimensions(b"GIF89a\x10\x00\x08\x00"), Some((16, 8)));
    }

    #[tokio::test]
    async fn text_payload_completes_with_invalid_signature() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not an image"))
            .mount(&server)
            .await;

        let target = TargetDescriptor::new(Url::parse(&server.uri()).unwrap());
        let details = ImageValidity
            .run(&target, &ProbeContext::new())
            .await
            .unwrap();

        assert_eq!(details["is_valid_signature"], json!(false));
        assert_eq!(details["detected_format"], json!("unknown"));
    }

    #[tokio::test]
    async fn complete_jpeg_passes_the_signature_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(jpeg_bytes(0xC0, 320, 240)),
            )
            .mount(&server)
            .await;

        let target = TargetDescriptor::new(Url::parse(&server.uri()).unwrap());
        let details = ImageValidity
            .run(&target, &ProbeContext::new())
            .await
            .unwrap();

        assert_eq!(details["is_valid_signature"], json!(true));
        assert_eq!(details["detected_format"], json!("jpeg"));
    }

    #[tokio::test]
    async fn metadata_reports_format_dimensions_and_progressive_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(jpeg_bytes(0xC2, 1280, 720)),
            )
            .mount(&server)
            .await;

        let target = TargetDescriptor::new(Url::parse(&server.uri()).unwrap());
        let details = ImageMetadata
            .run(&target, &ProbeContext::new())
            .await
            .unwrap();

        assert_eq!(details["format"], json!("jpeg"));
        assert_eq!(details["width"], json!(1280));
        assert_eq!(details["height"], json!(720));
        assert_eq!(details["progressive"], json!(true));
    }

    #[tokio::test]
    async fn undecodable_payload_is_a_decode_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("plain text"))
            .mount(&server)
            .await;

        let target = TargetDescriptor::new(Url::parse(&server.uri()).unwrap());
        let err = ImageMetadata
            .run(&target, &ProbeContext::new())
            .await
            .unwrap_err();

        assert_eq!(err.failure.kind(), "decode");
        assert_eq!(err.partial["content_length"], json!(10));
    }

    #[tokio::test]
    async fn fetch_failure_fails_the_validity_probe() {
        let target = TargetDescriptor::new(Url::parse("http://127.0.0.1:1/a.jpg").unwrap());
        let err = ImageValidity
            .run(&target, &ProbeContext::new())
            .await
            .unwrap_err();
        assert_eq!(err.failure.kind(), "transport");
    }
}
