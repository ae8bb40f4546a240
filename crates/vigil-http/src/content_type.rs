//! Response content types and the extension lookup used by the static
//! file service.

/// Content types the engine can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    #[default]
    PlainText,
    Html,
    Json,
    Javascript,
    Css,
    ApplicationXml,
    TextXml,
    Xsl,
    OctetStream,
    Svg,
    FontTruetype,
    FontOpentype,
    FontWoff,
    FontWoff2,
    FontObject,
    Png,
    Jpg,
    Gif,
    Xicon,
    Bmp,
    Icns,
    Prometheus,
    AudioMpeg,
    AudioOgg,
    VideoMp4,
    Pdf,
    Zip,
}

impl ContentType {
    /// Wire representation for the `Content-Type` response header.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Html => "text/html; charset=utf-8",
            Self::ApplicationXml => "application/xml; charset=utf-8",
            Self::Json => "application/json; charset=utf-8",
            Self::Javascript => "application/javascript; charset=utf-8",
            Self::Css => "text/css; charset=utf-8",
            Self::TextXml => "text/xml; charset=utf-8",
            Self::Xsl => "text/xsl; charset=utf-8",
            Self::OctetStream => "application/octet-stream",
            Self::Svg => "image/svg+xml",
            Self::FontTruetype => "application/x-font-truetype",
            Self::FontOpentype => "application/x-font-opentype",
            Self::FontWoff => "application/font-woff",
            Self::FontWoff2 => "application/font-woff2",
            Self::FontObject => "application/vnd.ms-fontobject",
            Self::Png => "image/png",
            Self::Jpg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Xicon => "image/x-icon",
            Self::Bmp => "image/bmp",
            Self::Icns => "image/icns",
            Self::Prometheus => "text/plain; version=0.0.4",
            Self::AudioMpeg => "audio/mpeg",
            Self::AudioOgg => "audio/ogg",
            Self::VideoMp4 => "video/mp4",
            Self::Pdf => "application/pdf",
            Self::Zip => "application/zip",
            Self::PlainText => "text/plain; charset=utf-8",
        }
    }

    /// Content type for a filename, keyed on the extension after the
    /// last dot of the last path segment. Unknown or missing extensions
    /// map to `application/octet-stream`.
    #[must_use]
    pub fn for_filename(filename: &str) -> Self {
        let Some(dot) = filename.rfind('.') else {
            return Self::OctetStream;
        };
        let ext = &filename[dot + 1..];
        if ext.is_empty() {
            return Self::OctetStream;
        }

        match ext {
            "html" => Self::Html,
            "js" => Self::Javascript,
            "css" => Self::Css,
            "xml" => Self::TextXml,
            "xsl" => Self::Xsl,
            "txt" => Self::PlainText,
            "svg" => Self::Svg,
            "ttf" => Self::FontTruetype,
            "otf" => Self::FontOpentype,
            "woff2" => Self::FontWoff2,
            "woff" => Self::FontWoff,
            "eot" => Self::FontObject,
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpg,
            "gif" => Self::Gif,
            "bmp" => Self::Bmp,
            "ico" => Self::Xicon,
            "icns" => Self::Icns,
            _ => Self::OctetStream,
        }
    }
}
