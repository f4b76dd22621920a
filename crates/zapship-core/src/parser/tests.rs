use super::*;
use std::path::PathBuf;

#[test]
fn test_parse_full_pipeline() {
    let kdl = r#"
        image "liatrio/zap" tag="2.7.0"
        registry "docker.io"
        release-branch "master"
        context "image"
        dockerfile "Dockerfile"
        credentials "dockerhub" username-env="dockerUsername" password-env="dockerPassword"
        build-args {
            ZAP_VERSION "2.7.0"
        }
        no-cache #false
        pull #true
    "#;

    let pipeline = parse_pipeline_string(kdl).unwrap();
    assert_eq!(pipeline.image.as_deref(), Some("liatrio/zap"));
    assert_eq!(pipeline.tag.as_deref(), Some("2.7.0"));
    assert_eq!(pipeline.registry.as_deref(), Some("docker.io"));
    assert_eq!(pipeline.release_branch.as_deref(), Some("master"));
    assert_eq!(pipeline.context, Some(PathBuf::from("image")));
    assert_eq!(pipeline.dockerfile, Some(PathBuf::from("Dockerfile")));
    assert_eq!(pipeline.no_cache, Some(false));
    assert_eq!(pipeline.pull, Some(true));
    assert_eq!(
        pipeline.build_args.get("ZAP_VERSION"),
        Some(&"2.7.0".to_string())
    );

    let creds = pipeline.credentials.unwrap();
    assert_eq!(creds.id, "dockerhub");
    assert_eq!(creds.username_env, "dockerUsername");
    assert_eq!(creds.password_env, "dockerPassword");
}

#[test]
fn test_parse_separate_tag_node() {
    let kdl = r#"
        image "liatrio/zap"
        tag "2.8.0"
    "#;

    let pipeline = parse_pipeline_string(kdl).unwrap();
    assert_eq!(pipeline.image.as_deref(), Some("liatrio/zap"));
    assert_eq!(pipeline.tag.as_deref(), Some("2.8.0"));
}

#[test]
fn test_parse_credentials_defaults_env_names() {
    let kdl = r#"credentials "Dockerhub""#;

    let pipeline = parse_pipeline_string(kdl).unwrap();
    let creds = pipeline.credentials.unwrap();
    // 識別子の大文字小文字はそのまま保持する
    assert_eq!(creds.id, "Dockerhub");
    assert_eq!(creds.username_env, "dockerUsername");
    assert_eq!(creds.password_env, "dockerPassword");
}

#[test]
fn test_parse_bare_flag() {
    let kdl = "no-cache";
    let pipeline = parse_pipeline_string(kdl).unwrap();
    assert_eq!(pipeline.no_cache, Some(true));
}

#[test]
fn test_parse_unknown_nodes_are_skipped() {
    let kdl = r#"
        image "liatrio/zap"
        notify "slack"
    "#;

    let pipeline = parse_pipeline_string(kdl).unwrap();
    assert_eq!(pipeline.image.as_deref(), Some("liatrio/zap"));
}

#[test]
fn test_parse_image_without_argument_is_error() {
    let kdl = "image";
    let result = parse_pipeline_string(kdl);
    assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
}

#[test]
fn test_parse_invalid_kdl() {
    let result = parse_pipeline_string("image \"unterminated");
    assert!(matches!(result, Err(PipelineError::KdlParse(_))));
}

#[test]
fn test_parse_empty_document() {
    let pipeline = parse_pipeline_string("").unwrap();
    assert_eq!(pipeline, PipelineDocument::default());
}

#[test]
fn test_parse_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("pipeline.kdl");
    std::fs::write(&path, r#"release-branch "main""#).unwrap();

    let pipeline = parse_pipeline_file(&path).unwrap();
    assert_eq!(pipeline.release_branch.as_deref(), Some("main"));
}

#[test]
fn test_parse_missing_file() {
    let result = parse_pipeline_file("/nonexistent/pipeline.kdl");
    assert!(matches!(result, Err(PipelineError::IoError { .. })));
}

#[test]
fn test_parse_repository_pipeline() {
    let pipeline = parse_pipeline_string(include_str!("../../../../pipeline.kdl")).unwrap();

    assert_eq!(pipeline.image.as_deref(), Some("liatrio/zap"));
    assert_eq!(pipeline.tag.as_deref(), Some("2.7.0"));
    assert_eq!(pipeline.release_branch.as_deref(), Some("master"));
    assert_eq!(
        pipeline.build_args.get("ZAP_VERSION").map(String::as_str),
        pipeline.tag.as_deref()
    );
}
