use jukebox_relay::youtube::{extract_video_id, thumbnail_url};

const ID: &str = "dQw4w9WgXcQ";

#[test]
fn accepts_every_supported_url_shape() {
    let inputs = [
        "dQw4w9WgXcQ",
        "  dQw4w9WgXcQ  ",
        "https://youtu.be/dQw4w9WgXcQ",
        "youtu.be/dQw4w9WgXcQ",
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        "http://youtube.com/watch?v=dQw4w9WgXcQ&t=42",
        "www.youtube.com/watch?v=dQw4w9WgXcQ",
        "youtube.com/watch?v=dQw4w9WgXcQ",
        "https://www.youtube.com/embed/dQw4w9WgXcQ",
        "https://youtube.com/shorts/dQw4w9WgXcQ",
        "https://www.youtube.com/v/dQw4w9WgXcQ",
        "https://music.youtube.com/watch?v=dQw4w9WgXcQ",
        "music.youtube.com/watch?v=dQw4w9WgXcQ",
    ];
    for input in inputs {
        assert_eq!(
            extract_video_id(input).as_deref(),
            Some(ID),
            "input {:?}",
            input
        );
    }
}

#[test]
fn rejects_near_misses() {
    let inputs = [
        "",
        "dQw4w9WgXc",                                // 10 chars
        "dQw4w9WgXcQQ",                              // 12 chars
        "https://youtube.com/watch?v=dQw4w9WgXc",    // 10-char ID in a valid URL
        "https://youtube.com/watch?v=dQw4w9WgXcQQ",  // 12-char ID in a valid URL
        "https://example.com/watch?v=dQw4w9WgXcQ",   // wrong host
        "https://youtube.com/playlist?list=PL12345", // wrong path
        "https://youtube.com/watch",                 // no v param
        "https://music.youtube.com/embed/dQw4w9WgXcQ",
        "https://youtu.be/",
        "not a url at all",
        "dQw4w9WgXc!",                               // bad character
    ];
    for input in inputs {
        assert_eq!(extract_video_id(input), None, "input {:?}", input);
    }
}

#[test]
fn thumbnail_is_derived_from_the_id() {
    assert_eq!(
        thumbnail_url(ID),
        "https://img.youtube.com/vi/dQw4w9WgXcQ/mqdefault.jpg"
    );
}
