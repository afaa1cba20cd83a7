//! Line-oriented HLS playlist rewriting.
//!
//! Every line is classified into one of three classes. Only segment
//! references are rewritten; unknown tags fall into `PassThrough` and are
//! emitted untouched.

pub const KEY_DIRECTIVE_TAG: &str = "#EXT-X-KEY";
pub const SEGMENT_EXTENSION: &str = ".ts";
pub const PLAYLIST_EXTENSION: &str = ".m3u8";
pub const HLS_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass<'a> {
    /// Already points at the key proxy; never rewritten here.
    KeyDirective,
    /// Media segment, identified by its base file name.
    Segment { file_name: &'a str },
    PassThrough,
}

pub fn classify(line: &str) -> LineClass<'_> {
    let trimmed = line.trim();
    if trimmed.starts_with(KEY_DIRECTIVE_TAG) {
        LineClass::KeyDirective
    } else if trimmed.starts_with('#') {
        LineClass::PassThrough
    } else if trimmed.ends_with(SEGMENT_EXTENSION) {
        let file_name = trimmed.rsplit('/').next().unwrap_or(trimmed);
        LineClass::Segment { file_name }
    } else {
        LineClass::PassThrough
    }
}

/// A playlist split on `\n`, with each line's class precomputed.
pub struct Playlist<'a> {
    lines: Vec<(&'a str, LineClass<'a>)>,
}

impl<'a> Playlist<'a> {
    pub fn parse(raw: &'a str) -> Self {
        Self {
            lines: raw.split('\n').map(|line| (line, classify(line))).collect(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn segments(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.lines.iter().filter_map(|(_, class)| match class {
            LineClass::Segment { file_name } => Some(*file_name),
            _ => None,
        })
    }

    /// Replaces segment lines, in order, with `urls`. A trailing `\r` on the
    /// original line is kept.
    pub fn render(&self, urls: &[String]) -> String {
        let mut urls = urls.iter();
        let rendered: Vec<String> = self
            .lines
            .iter()
            .map(|(line, class)| match (class, line.strip_suffix('\r')) {
                (LineClass::Segment { .. }, stripped) => match urls.next() {
                    Some(url) if stripped.is_some() => format!("{}\r", url),
                    Some(url) => url.clone(),
                    None => line.to_string(),
                },
                _ => line.to_string(),
            })
            .collect();
        rendered.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYLIST: &str = "#EXTM3U\n\
        #EXT-X-VERSION:3\n\
        #EXT-X-KEY:METHOD=AES-128,URI=\"http://api/videos/sample/keys/enc_360p.key\",IV=0x00\n\
        #EXTINF:4.000000,\n\
        360p_000.ts\n\
        #EXTINF:4.000000,\n\
        360p_001.ts\n\
        #EXT-X-ENDLIST\n";

    fn signed(names: &[&str]) -> Vec<String> {
        names
            .iter()
            .map(|n| format!("https://minio/bucket/courses/sample/{}?sig=1", n))
            .collect()
    }

    #[test]
    fn classifies_each_line_kind() {
        assert_eq!(classify("#EXT-X-KEY:METHOD=AES-128"), LineClass::KeyDirective);
        assert_eq!(classify("  #EXT-X-KEY:URI=\"x.ts\"\r"), LineClass::KeyDirective);
        assert_eq!(classify("#EXTINF:4.0,"), LineClass::PassThrough);
        assert_eq!(classify("#EXT-X-MAP:URI=\"init.ts\""), LineClass::PassThrough);
        assert_eq!(classify("360p.m3u8"), LineClass::PassThrough);
        assert_eq!(classify(""), LineClass::PassThrough);
        assert_eq!(
            classify("sub/dir/720p_010.ts\r"),
            LineClass::Segment { file_name: "720p_010.ts" }
        );
    }

    #[test]
    fn segments_are_replaced_and_line_count_kept() {
        let playlist = Playlist::parse(PLAYLIST);
        let names: Vec<&str> = playlist.segments().collect();
        assert_eq!(names, ["360p_000.ts", "360p_001.ts"]);

        let rendered = playlist.render(&signed(&names));

        assert_eq!(rendered.split('\n').count(), PLAYLIST.split('\n').count());
        assert!(rendered.contains("\nhttps://minio/bucket/courses/sample/360p_000.ts?sig=1\n"));
        assert!(!rendered.contains("\n360p_001.ts\n"));
        let key_line = PLAYLIST.lines().nth(2).unwrap();
        assert!(rendered.lines().any(|l| l == key_line));
        assert!(rendered.ends_with("#EXT-X-ENDLIST\n"));
    }

    #[test]
    fn carriage_returns_survive() {
        let crlf = PLAYLIST.replace('\n', "\r\n");
        let playlist = Playlist::parse(&crlf);
        let names: Vec<&str> = playlist.segments().collect();
        let rendered = playlist.render(&signed(&names));

        assert_eq!(rendered, {
            let mut expected = crlf.clone();
            for name in &names {
                expected = expected.replacen(
                    &format!("{}\r", name),
                    &format!("https://minio/bucket/courses/sample/{}?sig=1\r", name),
                    1,
                );
            }
            expected
        });
    }

    #[test]
    fn master_playlist_is_untouched() {
        let master = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=480x360\n360p.m3u8\n";
        let playlist = Playlist::parse(master);

        assert_eq!(playlist.segments().count(), 0);
        assert_eq!(playlist.render(&[]), master);
        assert_eq!(playlist.line_count(), 4);
    }
}
