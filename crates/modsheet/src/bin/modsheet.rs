use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use modsheet::{
    build_workbook, merge_marks, read_export, BuildOptions, ChildCohortOptions, CourseworkColumn,
    MergeOptions, TemplateLayout,
};
use modsheet_xlsx::XlsxPackage;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "modsheet", version)]
#[command(about = "Build moderation workbooks from LMS mark exports and merge moderated marks back.")]
struct Cli {
    /// JSON file overriding template cell positions and sheet names.
    #[arg(long, global = true, value_name = "PATH")]
    layout: Option<PathBuf>,

    /// Enable debug output (`RUST_LOG` takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fill a moderation template from an LMS export.
    Build(BuildArgs),
    /// Write moderated marks from a filled workbook back into the LMS export.
    Merge(MergeArgs),
    /// Show what modsheet detects in an export and/or a template.
    Inspect(InspectArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// LMS export (delimited text).
    export: PathBuf,

    /// Moderation template workbook.
    #[arg(long, value_name = "PATH")]
    template: PathBuf,

    /// Output workbook (default: the export path with an `.xlsx` extension).
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Module code of the main cohort (default: the template's exam module cell).
    #[arg(long, default_value = "")]
    module_code: String,

    #[arg(long, default_value = "")]
    module_name: String,

    #[arg(long, default_value = "")]
    organiser: String,

    /// Export column holding student identifiers.
    #[arg(long, default_value = "Username")]
    student_id_col: String,

    /// Coursework mark column, optionally with a template label (repeatable, up to four).
    #[arg(long = "cw", value_name = "HEADER[=LABEL]")]
    coursework: Vec<String>,

    /// Export column naming the child course; rows with a module code there form a child cohort.
    #[arg(long, value_name = "HEADER")]
    child_course_col: Option<String>,

    /// Coursework mark column for the child cohort (repeatable, up to four).
    #[arg(long = "child-cw", value_name = "HEADER[=LABEL]", requires = "child_course_col")]
    child_coursework: Vec<String>,
}

#[derive(Args)]
struct MergeArgs {
    /// The LMS export the workbook was built from.
    export: PathBuf,

    /// Filled-in moderation workbook.
    #[arg(long, value_name = "PATH")]
    workbook: PathBuf,

    /// Upload file (default: `<export stem>_upload.xls` next to the export).
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Module code of rows without a child course (default: the workbook's exam module cell).
    #[arg(long)]
    module_code: Option<String>,

    #[arg(long, default_value = "Username")]
    student_id_col: String,

    #[arg(long, value_name = "HEADER")]
    child_course_col: Option<String>,

    /// Column receiving marks for every module without its own `--target`.
    #[arg(long, value_name = "HEADER")]
    target_col: Option<String>,

    /// Column receiving marks for one module (repeatable).
    #[arg(long = "target", value_name = "MODULE=HEADER")]
    targets: Vec<String>,

    /// Blank the target column of rows without a moderated mark.
    #[arg(long)]
    blank_unmatched: bool,
}

#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Args)]
struct InspectArgs {
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,

    #[arg(long, value_name = "PATH")]
    template: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct ExportSummary {
    path: String,
    encoding: &'static str,
    delimiter: String,
    headers: Vec<String>,
    records: usize,
}

#[derive(Debug, Serialize)]
struct TemplateSummary {
    path: String,
    sheets: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
struct InspectReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    export: Option<ExportSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    template: Option<TemplateSummary>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let layout = match &cli.layout {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("read layout {}", path.display()))?;
            TemplateLayout::from_json(&json)
                .with_context(|| format!("parse layout {}", path.display()))?
        }
        None => TemplateLayout::default(),
    };

    match cli.command {
        Command::Build(args) => run_build(args, &layout),
        Command::Merge(args) => run_merge(args, &layout),
        Command::Inspect(args) => run_inspect(args),
    }
}

fn run_build(args: BuildArgs, layout: &TemplateLayout) -> Result<()> {
    let template = read(&args.template)?;
    let export = read(&args.export)?;

    let child = args
        .child_course_col
        .map(|column| -> Result<ChildCohortOptions> {
            Ok(ChildCohortOptions {
                child_course_column: column,
                coursework_columns: coursework_columns(&args.child_coursework)?,
            })
        })
        .transpose()?;
    let options = BuildOptions {
        module_code: args.module_code,
        module_name: args.module_name,
        organiser: args.organiser,
        student_id_column: args.student_id_col,
        coursework_columns: coursework_columns(&args.coursework)?,
        child,
    };

    let output = build_workbook(&template, &export, layout, &options)
        .with_context(|| format!("build workbook from {}", args.export.display()))?;
    let out_path = args
        .output
        .unwrap_or_else(|| args.export.with_extension("xlsx"));
    write(&out_path, &output.workbook)?;

    info!("wrote workbook: {}", out_path.display());
    info!("student id column: {}", output.report.student_id_column);
    if let Some(column) = &output.report.child_course_column {
        info!("child course column: {column}");
    }
    for cohort in &output.report.cohorts {
        info!(
            "{} module={} courseworks={} students={}",
            cohort.name, cohort.module_code, cohort.coursework_columns, cohort.students
        );
    }
    Ok(())
}

fn run_merge(args: MergeArgs, layout: &TemplateLayout) -> Result<()> {
    let export = read(&args.export)?;
    let workbook = read(&args.workbook)?;

    let options = MergeOptions {
        student_id_column: args.student_id_col,
        module_code: args.module_code,
        child_course_column: args.child_course_col,
        target_column: args.target_col,
        target_columns: module_targets(&args.targets)?,
        blank_unmatched: args.blank_unmatched,
    };

    let output = merge_marks(&export, &workbook, layout, &options)
        .with_context(|| format!("merge {} into {}", args.workbook.display(), args.export.display()))?;
    let out_path = args.output.unwrap_or_else(|| upload_path(&args.export));
    write(&out_path, &output.export)?;

    let report = &output.report;
    info!("wrote upload file: {}", out_path.display());
    info!("rows in export: {}", report.records);
    info!("marks extracted from workbook: {}", report.marks);
    info!("rows updated: {}", report.updated);
    if report.blanked > 0 {
        info!("rows blanked: {}", report.blanked);
    }
    info!("student id column: {}", report.student_id_column);
    for (module, target) in &report.targets {
        info!("target {module}: {target}");
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let mut report = InspectReport::default();

    if let Some(path) = &args.export {
        let table = read_export(&read(path)?)
            .with_context(|| format!("read export {}", path.display()))?;
        report.export = Some(ExportSummary {
            path: path.display().to_string(),
            encoding: table.encoding().label(),
            delimiter: table.delimiter().escape_default().to_string(),
            headers: table.headers().to_vec(),
            records: table.len(),
        });
    }
    if let Some(path) = &args.template {
        let package = XlsxPackage::from_bytes(&read(path)?)
            .with_context(|| format!("open workbook {}", path.display()))?;
        report.template = Some(TemplateSummary {
            path: path.display().to_string(),
            sheets: package.sheet_names(),
        });
    }
    if report.export.is_none() && report.template.is_none() {
        return Err(anyhow!("nothing to inspect: pass --export and/or --template"));
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            if let Some(export) = &report.export {
                println!("export:    {}", export.path);
                println!("encoding:  {}", export.encoding);
                println!("delimiter: {}", export.delimiter);
                println!("records:   {}", export.records);
                for (idx, header) in export.headers.iter().enumerate() {
                    println!("  [{idx}] {header}");
                }
            }
            if let Some(template) = &report.template {
                println!("template:  {}", template.path);
                for sheet in &template.sheets {
                    println!("  {sheet}");
                }
            }
        }
    }
    Ok(())
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("read {}", path.display()))
}

fn write(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("write {}", path.display()))
}

/// `<stem>_upload.xls` next to the export, the name the LMS expects for re-upload.
fn upload_path(export: &Path) -> PathBuf {
    let stem = export
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    export.with_file_name(format!("{stem}_upload.xls"))
}

fn coursework_columns(args: &[String]) -> Result<Vec<CourseworkColumn>> {
    args.iter()
        .map(|arg| match arg.split_once('=') {
            Some((header, label)) if !header.trim().is_empty() => {
                Ok(CourseworkColumn::new(header.trim()).with_label(label.trim()))
            }
            Some(_) => Err(anyhow!("invalid coursework column '{arg}': empty header")),
            None => Ok(CourseworkColumn::new(arg.trim())),
        })
        .collect()
}

fn module_targets(args: &[String]) -> Result<BTreeMap<String, String>> {
    args.iter()
        .map(|arg| {
            let (module, header) = arg
                .split_once('=')
                .with_context(|| format!("invalid target '{arg}': expected MODULE=HEADER"))?;
            Ok((module.trim().to_string(), header.trim().to_string()))
        })
        .collect()
}
