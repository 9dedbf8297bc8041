mod test_harness;

use serde_json::json;
use std::collections::BTreeMap;

use mlplane_client::{
    ClientError, JobKind, JobStatus, ProcessingInput, ProcessingOutput, Processor, ProcessorConfig,
    RunOptions, ScriptProcessor,
};
use test_harness::{FakePlatform, TEST_ACCOUNT, init_tracing};

const IMAGE: &str = "123456789012.dkr.ecr.us-west-2.amazonaws.com/feature-prep:latest";

fn config() -> ProcessorConfig {
    ProcessorConfig::new("ProcessingRole", IMAGE, 2, "ml.m5.xlarge")
}

#[tokio::test]
async fn test_run_builds_request_with_defaults() {
    init_tracing();
    let fake = FakePlatform::new();
    fake.script_jobs(JobKind::Processing, &[JobStatus::InProgress, JobStatus::Completed]);

    let mut processor = Processor::new(
        fake.session(),
        config()
            .with_max_runtime(1800)
            .with_env(BTreeMap::from([("MODE".to_string(), "full".to_string())])),
    );
    let job = processor
        .run(
            vec![ProcessingInput::new("s3://test-bucket/raw", "/opt/ml/processing/input/raw")],
            vec![ProcessingOutput::new("/opt/ml/processing/output")],
            RunOptions::default().with_arguments(vec!["--split".to_string(), "0.2".to_string()]),
        )
        .await
        .unwrap();

    assert!(job.name().starts_with("feature-prep-"));
    assert_eq!(processor.latest_job().map(|j| j.name()), Some(job.name()));
    assert_eq!(fake.calls("DescribeJob"), 2);

    let request = fake.requests("CreateProcessingJob")[0].clone();
    assert_eq!(request["ProcessingJobName"], job.name());
    assert_eq!(request["ProcessingInputs"][0]["InputName"], "input-1");
    assert_eq!(
        request["ProcessingInputs"][0]["S3Input"]["S3Uri"],
        "s3://test-bucket/raw"
    );
    assert_eq!(
        request["ProcessingOutputConfig"]["Outputs"][0],
        json!({
            "OutputName": "output-1",
            "S3Output": {
                "S3Uri": format!("s3://test-bucket/{}/output/output-1", job.name()),
                "LocalPath": "/opt/ml/processing/output",
                "S3UploadMode": "EndOfJob"
            }
        })
    );
    assert_eq!(
        request["ProcessingResources"]["ClusterConfig"],
        json!({"InstanceCount": 2, "InstanceType": "ml.m5.xlarge", "VolumeSizeInGB": 30})
    );
    assert_eq!(request["StoppingCondition"]["MaxRuntimeInSeconds"], 1800);
    assert_eq!(
        request["AppSpecification"],
        json!({"ImageUri": IMAGE, "ContainerArguments": ["--split", "0.2"]})
    );
    assert_eq!(request["Environment"], json!({"MODE": "full"}));
    assert_eq!(
        request["RoleArn"],
        format!("arn:aws:iam::{TEST_ACCOUNT}:role/ProcessingRole")
    );
}

#[tokio::test]
async fn test_run_uploads_local_inputs() {
    let fake = FakePlatform::new();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("rows.csv"), "a,b\n1,2\n").unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    std::fs::write(dir.path().join("nested").join("more.csv"), "a,b\n3,4\n").unwrap();

    let mut processor = Processor::new(fake.session(), config());
    processor
        .run(
            vec![
                ProcessingInput::new(dir.path().to_str().unwrap(), "/opt/ml/processing/input/data")
                    .with_name("data"),
            ],
            Vec::new(),
            RunOptions::no_wait().with_job_name("prep-job"),
        )
        .await
        .unwrap();

    assert_eq!(
        fake.blob("s3://test-bucket/prep-job/input/data/rows.csv").unwrap(),
        b"a,b\n1,2\n"
    );
    assert!(fake.blob("s3://test-bucket/prep-job/input/data/nested/more.csv").is_some());

    let request = fake.requests("CreateProcessingJob")[0].clone();
    assert_eq!(
        request["ProcessingInputs"][0]["S3Input"]["S3Uri"],
        "s3://test-bucket/prep-job/input/data"
    );
    assert!(request.get("ProcessingOutputConfig").is_none());
    assert_eq!(fake.calls("DescribeJob"), 0);
}

#[tokio::test]
async fn test_run_rejects_local_output_destination() {
    let fake = FakePlatform::new();
    let mut processor = Processor::new(fake.session(), config());

    let err = processor
        .run(
            Vec::new(),
            vec![ProcessingOutput::new("/opt/ml/processing/output").with_destination("/tmp/out")],
            RunOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(fake.calls("CreateProcessingJob"), 0);
}

#[tokio::test]
async fn test_run_logs_require_wait() {
    let fake = FakePlatform::new();
    let mut processor = Processor::new(fake.session(), config());

    let options = RunOptions {
        wait: false,
        ..RunOptions::default()
    };
    assert!(matches!(
        processor.run(Vec::new(), Vec::new(), options).await,
        Err(ClientError::Validation(_))
    ));
}

#[tokio::test]
async fn test_processor_keeps_every_job() {
    let fake = FakePlatform::new();
    let mut processor = Processor::new(fake.session(), config());

    for name in ["run-1", "run-2"] {
        processor
            .run(Vec::new(), Vec::new(), RunOptions::no_wait().with_job_name(name))
            .await
            .unwrap();
    }

    let names: Vec<&str> = processor.jobs().iter().map(|j| j.name()).collect();
    assert_eq!(names, vec!["run-1", "run-2"]);
    assert_eq!(fake.job_names(JobKind::Processing), vec!["run-1", "run-2"]);
}

#[tokio::test]
async fn test_script_processor_uploads_code() {
    let fake = FakePlatform::new();
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("preprocess.py");
    std::fs::write(&script, "print('hello')\n").unwrap();

    let mut processor = ScriptProcessor::sklearn(
        fake.session(),
        "0.20.0",
        ProcessorConfig::new("ProcessingRole", "replaced", 1, "ml.m5.large"),
        None,
    )
    .unwrap();
    processor
        .run(
            script.to_str().unwrap(),
            vec![ProcessingInput::new("s3://test-bucket/raw", "/opt/ml/processing/input/raw")],
            Vec::new(),
            RunOptions::default().with_job_name("sklearn-job"),
        )
        .await
        .unwrap();

    assert_eq!(
        fake.blob("s3://test-bucket/sklearn-job/input/code/preprocess.py").unwrap(),
        b"print('hello')\n"
    );

    let request = fake.requests("CreateProcessingJob")[0].clone();
    assert_eq!(
        request["AppSpecification"]["ImageUri"],
        "246618743249.dkr.ecr.us-west-2.amazonaws.com/sagemaker-scikit-learn:0.20.0-cpu-py3"
    );
    assert_eq!(
        request["AppSpecification"]["ContainerEntrypoint"],
        json!(["python3", "/opt/ml/processing/input/code/preprocess.py"])
    );
    let inputs = request["ProcessingInputs"].as_array().unwrap();
    assert_eq!(inputs.len(), 2);
    assert_eq!(inputs[1]["InputName"], "code");
    assert_eq!(
        inputs[1]["S3Input"]["S3Uri"],
        "s3://test-bucket/sklearn-job/input/code/preprocess.py"
    );
    assert_eq!(inputs[1]["S3Input"]["LocalPath"], "/opt/ml/processing/input/code/");
}

#[tokio::test]
async fn test_script_processor_rejects_directory_code() {
    let fake = FakePlatform::new();
    let mut processor = ScriptProcessor::new(
        fake.session(),
        config(),
        vec!["bash".to_string()],
    );

    let err = processor
        .run(
            "s3://test-bucket/scripts/",
            Vec::new(),
            Vec::new(),
            RunOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(fake.calls("CreateProcessingJob"), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_uploads_symlinked_input_directories() {
    let fake = FakePlatform::new();
    let root = tempfile::tempdir().unwrap();
    let data = root.path().join("data");
    let shared = root.path().join("shared");
    std::fs::create_dir(&data).unwrap();
    std::fs::create_dir(&shared).unwrap();
    std::fs::write(data.join("a.csv"), "a\n1\n").unwrap();
    std::fs::write(shared.join("b.csv"), "b\n2\n").unwrap();
    std::os::unix::fs::symlink(&shared, data.join("linked")).unwrap();

    let mut processor = Processor::new(fake.session(), config());
    processor
        .run(
            vec![
                ProcessingInput::new(data.to_str().unwrap(), "/opt/ml/processing/input/data")
                    .with_name("data"),
            ],
            Vec::new(),
            RunOptions::no_wait().with_job_name("linked-job"),
        )
        .await
        .unwrap();

    assert_eq!(
        fake.blob_uris(),
        vec![
            "s3://test-bucket/linked-job/input/data/a.csv",
            "s3://test-bucket/linked-job/input/data/linked/b.csv",
        ]
    );
    assert_eq!(fake.calls("CreateProcessingJob"), 1);
}

#[tokio::test]
async fn test_run_keeps_job_when_wait_fails() {
    let fake = FakePlatform::new();
    fake.fail("DescribeJob", "flaky-job", 400, "describe rejected");
    let mut processor = Processor::new(fake.session(), config());

    let options = RunOptions {
        logs: false,
        ..RunOptions::default()
    };
    let err = processor
        .run(Vec::new(), Vec::new(), options.with_job_name("flaky-job"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::ApiError { status: 400, .. }));
    assert_eq!(fake.job_names(JobKind::Processing), vec!["flaky-job"]);
    assert_eq!(processor.latest_job().map(|j| j.name()), Some("flaky-job"));
    assert_eq!(processor.jobs().len(), 1);
}
