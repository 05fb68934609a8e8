//! Benchmarks for probe parsing and command synthesis
//!
//! Measures JSON normalization for both probers and plan building for a
//! track-heavy file.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::path::{Path, PathBuf};
use trackmux_av::probe::{parse_ffprobe_output, parse_mkvmerge_output};
use trackmux_av::{SynthesisOptions, Synthesizer, Tool, ToolRegistry};
use trackmux_core::{Container, EditContext, TrackModel};

/// mkvmerge -J output with `audio` audio tracks and `subs` subtitle tracks.
fn mkvmerge_json(audio: u32, subs: u32) -> String {
    let langs = ["eng", "spa", "por", "fra", "deu", "jpn"];
    let mut tracks = vec![
        r#"{"id":0,"type":"video","codec":"HEVC","properties":{"codec_id":"V_MPEGH/ISO/HEVC","language":"und"}}"#
            .to_string(),
    ];
    for i in 0..audio {
        tracks.push(format!(
            r#"{{"id":{},"type":"audio","codec":"AC-3","properties":{{"codec_id":"A_AC3","language":"{}","track_name":"Surround 5.1"}}}}"#,
            1 + i,
            langs[i as usize % langs.len()]
        ));
    }
    for i in 0..subs {
        tracks.push(format!(
            r#"{{"id":{},"type":"subtitles","codec":"SubRip/SRT","properties":{{"codec_id":"S_TEXT/UTF8","language":"{}"}}}}"#,
            1 + audio + i,
            langs[i as usize % langs.len()]
        ));
    }
    format!(
        r#"{{"container":{{"properties":{{"duration":7200000000000}}}},"tracks":[{}]}}"#,
        tracks.join(",")
    )
}

const FFPROBE_SIMPLE: &str = r#"{
    "format": { "duration": "7200.000000" },
    "streams": [
        { "index": 0, "codec_type": "video", "codec_name": "hevc", "disposition": {"default": 1, "forced": 0}, "tags": {} },
        { "index": 1, "codec_type": "audio", "codec_name": "truehd", "disposition": {"default": 1, "forced": 0},
          "tags": {"language": "eng", "title": "TrueHD 7.1"} },
        { "index": 2, "codec_type": "subtitle", "codec_name": "subrip", "disposition": {"default": 0, "forced": 1},
          "tags": {"language": "eng"} }
    ]
}"#;

fn synthesizer() -> Synthesizer {
    let tools = ToolRegistry::from_paths([
        (Tool::Mkvmerge, PathBuf::from("/usr/bin/mkvmerge")),
        (Tool::Mkvextract, PathBuf::from("/usr/bin/mkvextract")),
        (Tool::Ffmpeg, PathBuf::from("/usr/bin/ffmpeg")),
    ]);
    Synthesizer::new(tools, SynthesisOptions::default())
}

fn bench_probe_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("probe_parsing");
    let path = Path::new("/movies/movie.mkv");

    for tracks in [4u32, 32, 128] {
        let json = mkvmerge_json(tracks / 2, tracks / 2);
        group.bench_with_input(BenchmarkId::new("mkvmerge", tracks), &json, |b, json| {
            b.iter(|| parse_mkvmerge_output(path, black_box(json)))
        });
    }

    group.bench_function("ffprobe_simple", |b| {
        b.iter(|| parse_ffprobe_output(Path::new("/movies/movie.mp4"), black_box(FFPROBE_SIMPLE)))
    });

    group.finish();
}

fn bench_synthesis(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesis");
    let synth = synthesizer();
    let path = Path::new("/movies/movie.mkv");

    for tracks in [4u32, 32, 128] {
        let media = parse_mkvmerge_output(path, &mkvmerge_json(tracks / 2, tracks / 2))
            .expect("bench fixture parses");

        let mut edit = TrackModel::new(EditContext::Edit);
        edit.load(media.clone());
        group.bench_with_input(BenchmarkId::new("edit_mkv", tracks), &edit, |b, model| {
            b.iter(|| synth.edit(black_box(model), Path::new("/out/movie_edited.mkv"), Container::Mkv))
        });
        group.bench_with_input(BenchmarkId::new("edit_mp4", tracks), &edit, |b, model| {
            b.iter(|| synth.edit(black_box(model), Path::new("/out/movie.mp4"), Container::Mp4))
        });

        group.bench_with_input(BenchmarkId::new("load_model", tracks), &media, |b, media| {
            b.iter(|| {
                let mut model = TrackModel::new(EditContext::Extract);
                model.load(black_box(media.clone()));
                model
            })
        });

        let mut extract = TrackModel::new(EditContext::Extract);
        extract.load(media);
        extract.set_all_keep(true);
        group.bench_with_input(BenchmarkId::new("extract", tracks), &extract, |b, model| {
            b.iter(|| synth.extract(black_box(model), Path::new("/out")))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_probe_parsing, bench_synthesis);
criterion_main!(benches);
