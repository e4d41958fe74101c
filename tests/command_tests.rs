use pretty_assertions::assert_eq;
use std::fs;
use tarmac_annotate::commands::{execute_annotate, validate_args, AnnotateArgs};
use tarmac_annotate::output::read_report;
use tarmac_annotate::utils::config::SCHEMA_VERSION;

const LISTING: &str = "\
    Project_AppMain
        0x2000b000:    b510        ..      PUSH     {r4,lr}
        0x2000b002:    f7fffddd    ....    BL       LOG_ILogWaypointValue ; 0x2000b008
        0x2000b006:    bd10        ..      POP      {r4,pc}
    LOG_ILogWaypointValue
        0x2000b008:    b510        ..      PUSH     {r4,lr}
        0x2000b00a:    bd10        ..      POP      {r4,pc}
";

const TRACE: &str = "\
10 ns IT 2000b000 b510 PUSH {r4,lr}
20 ns R r13 2001fe48 (MSP)
30 ns IT 2000b002 f7fffddd BL LOG_ILogWaypointValue
40 ns IT 2000b008 b510 PUSH {r4,lr}
50 ns MW4_D 2001ec00 00000001
60 ns IT 2000b00a bd10 POP {r4,pc}
70 ns IT 2000b006 bd10 POP {r4,pc}
";

#[test]
fn test_annotate_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let trace = dir.path().join("tarmac.log");
    fs::write(&trace, TRACE).unwrap();
    fs::write(dir.path().join("Project_Assembly.txt"), LISTING).unwrap();

    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("log.c"), "void LOG_ILogWaypointValue( uint32 logVal )\n{\n}\n").unwrap();

    let watch = dir.path().join("watch.toml");
    fs::write(&watch, "[addresses]\n\"2001ec00\" = \"COUNTER\"\n").unwrap();

    let output = dir.path().join("out/annotated.log");
    let report = dir.path().join("report.json");

    let args = AnnotateArgs {
        trace: trace.clone(),
        output: Some(output.clone()),
        source_path: Some(src),
        watch_list: Some(watch),
        stack_file: true,
        comment_padding: 2,
        report: Some(report.clone()),
        ..Default::default()
    };
    validate_args(&args).unwrap();
    let summary = execute_annotate(args).unwrap();

    assert_eq!(summary.call_entries, 2);
    assert_eq!(summary.call_exits, 1);
    assert_eq!(summary.access_annotations, 1);

    let annotated = fs::read_to_string(&output).unwrap();
    assert!(annotated.contains("LOG_ILogWaypointValue entry (2000b008)\n"));
    assert!(annotated.contains("void LOG_ILogWaypointValue( uint32 logVal )\n"));
    assert!(annotated.contains("    Project_AppMain -> LOG_ILogWaypointValue\n"));
    assert!(annotated.contains("50 ns MW4_D 2001ec00 00000001  ; COUNTER <= 00000001\n"));

    let stack = fs::read_to_string(dir.path().join("tarmac-stack.log")).unwrap();
    assert_eq!(stack, "20 ns R r13 2001fe48 (MSP)    ; Project_AppMain\n");

    let report = read_report(&report).unwrap();
    assert_eq!(report.version, SCHEMA_VERSION);
    assert_eq!(report.summary, summary);
    assert!(report.list_file.ends_with("Project_Assembly.txt"));
    assert!(report.stack_file.unwrap().ends_with("tarmac-stack.log"));
    assert!(report.anomalies.is_empty());
}

#[test]
fn test_annotate_default_output_name() {
    let dir = tempfile::tempdir().unwrap();
    let trace = dir.path().join("tarmac.log");
    fs::write(&trace, TRACE).unwrap();
    fs::write(dir.path().join("listing.txt"), LISTING).unwrap();

    execute_annotate(AnnotateArgs {
        trace,
        ..Default::default()
    })
    .unwrap();

    let produced: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("tarmac-update-") && name.ends_with(".log"))
        .collect();
    assert_eq!(produced.len(), 1);
    // tarmac-update-YYYYMMDD-HHMMSS.log
    assert_eq!(produced[0].len(), "tarmac-update-20250814-093000.log".len());
}

#[test]
fn test_annotate_without_list_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let trace = dir.path().join("tarmac.log");
    fs::write(&trace, TRACE).unwrap();

    let result = execute_annotate(AnnotateArgs {
        trace,
        ..Default::default()
    });
    assert!(result.is_err());
}
