//! ID3 tagging and cover embedding using FFmpeg.

use tracing::info;

use crate::command::{FfmpegCommand, ToolRunner};
use crate::error::{MediaError, MediaResult};
use crate::tools::EmbedRequest;

/// Build the FFmpeg command that muxes the cover into the audio file.
///
/// Both streams are copied; the picture is marked as the attached cover.
pub fn embed_command(request: &EmbedRequest) -> FfmpegCommand {
    FfmpegCommand::new(&request.output_path)
        .input(&request.audio_path)
        .input(&request.cover_path)
        .map("0:0")
        .map("1:0")
        .metadata("title", &request.title)
        .metadata("artist", &request.artist)
        .audio_codec("copy")
        .video_codec("copy")
        .output_args(["-id3v2_version", "3", "-disposition:v:0", "attached_pic"])
}

/// Write `request.output_path` with title, artist and cover art.
pub async fn embed_metadata(
    ffmpeg_bin: &str,
    runner: &ToolRunner,
    request: &EmbedRequest,
) -> MediaResult<()> {
    for input in [&request.audio_path, &request.cover_path] {
        if !tokio::fs::try_exists(input).await.unwrap_or(false) {
            return Err(MediaError::FileNotFound(input.clone()));
        }
    }

    let cmd = embed_command(request);
    runner.run(ffmpeg_bin, &cmd.build_args()).await?;

    if !tokio::fs::try_exists(&request.output_path).await.unwrap_or(false) {
        return Err(MediaError::FileNotFound(request.output_path.clone()));
    }

    info!(
        output = %request.output_path.display(),
        title = %request.title,
        artist = %request.artist,
        "Embedded metadata"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn request(dir: &std::path::Path) -> EmbedRequest {
        EmbedRequest {
            audio_path: dir.join("audio.mp3"),
            cover_path: dir.join("cover.jpg"),
            title: "Never Gonna Give You Up".to_string(),
            artist: "Rick Astley".to_string(),
            output_path: dir.join("output.mp3"),
        }
    }

    #[test]
    fn test_embed_command_args() {
        let args = embed_command(&request(&PathBuf::from("/work"))).build_args();

        assert_eq!(
            args,
            vec![
                "-y",
                "-v",
                "error",
                "-i",
                "/work/audio.mp3",
                "-i",
                "/work/cover.jpg",
                "-map",
                "0:0",
                "-map",
                "1:0",
                "-metadata",
                "title=Never Gonna Give You Up",
                "-metadata",
                "artist=Rick Astley",
                "-c:a",
                "copy",
                "-c:v",
                "copy",
                "-id3v2_version",
                "3",
                "-disposition:v:0",
                "attached_pic",
                "/work/output.mp3",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_input_fails_before_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let req = request(dir.path());
        tokio::fs::write(&req.audio_path, b"audio").await.unwrap();

        let err = embed_metadata("ffmpeg", &ToolRunner::new(), &req)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(p) if p == req.cover_path));
    }
}
