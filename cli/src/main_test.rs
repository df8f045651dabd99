use super::*;

#[test]
fn affirmative_answers() {
    assert!(is_affirmative("y"));
    assert!(is_affirmative(" YES \n"));
    assert!(!is_affirmative(""));
    assert!(!is_affirmative("no"));
    assert!(!is_affirmative("yep"));
}

#[test]
fn arrival_prefers_navigation() {
    assert_eq!(arrived(Some(Route::Dashboard), None).unwrap(), Route::Dashboard);
    let err = arrived(None, Some("Login failed.".to_owned())).unwrap_err();
    assert_eq!(err.to_string(), "Login failed.");
}

#[test]
fn delete_flags_parse() {
    let cli = Cli::try_parse_from(["videotube", "--base-url", "http://api.test", "video", "delete", "v1", "-y"]).unwrap();
    assert_eq!(cli.base_url.as_deref(), Some("http://api.test"));
    match cli.command {
        Command::Video(VideoCommand { command: VideoSubcommand::Delete { video_id, yes, force } }) => {
            assert_eq!(video_id, "v1");
            assert!(yes);
            assert!(!force);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn upload_requires_file() {
    assert!(Cli::try_parse_from(["videotube", "upload", "--title", "Holiday"]).is_err());
}

fn video(value: Value) -> Video {
    serde_json::from_value(value).unwrap()
}

#[test]
fn feed_line_shows_owner_and_likes() {
    let clip = video(serde_json::json!({
        "_id": "v1",
        "title": "Sunset",
        "owner": { "_id": "u-1", "username": "maria" },
        "likeCount": 3,
    }));
    assert_eq!(video_line(&clip), "v1  Sunset  by maria  (3 likes)");

    let orphan = video(serde_json::json!({ "_id": "v2", "title": "Rain", "owner": "u-9" }));
    assert_eq!(video_line(&orphan), "v2  Rain  by Unknown  (0 likes)");
}

#[test]
fn details_fall_back_to_title_placeholder() {
    let clip = video(serde_json::json!({
        "_id": "v1",
        "title": "fog",
        "videoFile": "https://cdn.example.test/v1.mp4",
        "thumbnail": "",
        "isLiked": true,
        "likeCount": 1,
    }));
    let text = video_details(&clip);
    assert!(text.contains("thumbnail: none, placeholder [F]"), "{text}");
    assert!(text.contains("likes: 1, liked by you"), "{text}");
    assert!(text.contains("file: https://cdn.example.test/v1.mp4"), "{text}");
}

#[test]
fn videos_json_flag_parses() {
    let cli = Cli::try_parse_from(["videotube", "videos", "--json"]).unwrap();
    assert!(matches!(cli.command, Command::Videos { json: true }));
}
