use anyhow::{Context, Result};
use clap::Parser;
use lyrx_style::{
    is_style_file, ExtractConfig, JsonLinesWriter, LayerBlob, StylePipeline, StylxWriter,
};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

const LAYER_EXTENSION: &str = "lyrx";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// .lyrx ファイルを含む入力ディレクトリ
    #[arg(value_name = "INPUT_DIR")]
    input: PathBuf,

    /// 出力ファイル（拡張子 .stylx ならスタイルファイル、それ以外は JSON Lines）
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// ファイル名に含まれるマップ名（複数指定可）
    #[arg(short, long = "map-name", value_name = "NAME", required = true)]
    map_names: Vec<String>,

    /// 「その他すべて」として扱うラベル（指定時は既定値を置き換える）
    #[arg(long = "catch-all", value_name = "LABEL")]
    catch_all_labels: Vec<String>,

    /// 並列処理スレッド数（デフォルト: CPUコア数）
    #[arg(short, long)]
    threads: Option<usize>,

    /// サブディレクトリも探索する
    #[arg(short, long)]
    recursive: bool,
}

fn main() -> Result<()> {
    // ログの初期化
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let start_time = std::time::Instant::now();

    // スレッドプールの設定
    if let Some(threads) = args.threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to build thread pool")?;
    }

    if !args.input.is_dir() {
        error!("Invalid input path: {:?}", args.input);
        anyhow::bail!("Input path must be a directory");
    }

    let mut input_files = collect_layer_files(&args.input, args.recursive)?;
    if input_files.is_empty() {
        anyhow::bail!("No .lyrx files found in {}", args.input.display());
    }
    // 実行ごとに採番が変わらないようパス順に並べる
    input_files.sort();
    info!("Found {} layer files", input_files.len());

    let (blobs, unreadable) = read_blobs(&input_files);

    let mut config = ExtractConfig::new(args.map_names.iter().cloned());
    if !args.catch_all_labels.is_empty() {
        config.catch_all_labels = args.catch_all_labels.clone();
    }

    let mut pipeline = StylePipeline::new(config);
    let summary = if is_style_file(&args.output) {
        let mut writer = StylxWriter::create(&args.output)?;
        pipeline.run(&blobs, &mut writer)?
    } else {
        let mut writer = JsonLinesWriter::create(&args.output)?;
        pipeline.run(&blobs, &mut writer)?
    };

    info!(
        "emitted: {}, duplicates: {}, skipped: {}, unreadable: {}",
        summary.emitted, summary.duplicates, summary.skipped, unreadable
    );

    let elapsed = start_time.elapsed();
    info!("Total processing time: {:?}", elapsed);

    Ok(())
}

/// 読み込めたブロブと、読み込めなかったファイル数
fn read_blobs(paths: &[PathBuf]) -> (Vec<LayerBlob>, usize) {
    let mut blobs = Vec::with_capacity(paths.len());
    let mut unreadable = 0;

    for path in paths {
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        match fs::read_to_string(path) {
            Ok(text) => blobs.push(LayerBlob::new(file_name, text)),
            Err(e) => {
                warn!("Skipping unreadable file {:?}: {}", path, e);
                unreadable += 1;
            }
        }
    }

    (blobs, unreadable)
}

fn collect_layer_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let entries: Result<Vec<_>, _> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        .collect();
    let entries = entries?;

    // エントリを並列処理
    let nested: Vec<Vec<PathBuf>> = entries
        .into_par_iter()
        .map(|entry| -> Result<Vec<PathBuf>> {
            let path = entry.path();

            if path.is_dir() {
                if recursive {
                    return collect_layer_files(&path, recursive);
                }
                return Ok(Vec::new());
            }

            match path.extension().and_then(|s| s.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case(LAYER_EXTENSION) => Ok(vec![path]),
                _ => Ok(Vec::new()),
            }
        })
        .collect::<Result<_>>()?;

    Ok(nested.into_iter().flatten().collect())
}
