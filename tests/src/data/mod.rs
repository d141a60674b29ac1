use buildfarm_common::api::{Archive, ArchivePurpose, BuildRequest, Pocket, Urgency};
use buildfarm_common::config::BuilderConfig;
use buildfarm_common::{JobType, ResetProtocol};

pub const DUMMY_PROCESSOR: &str = "amd64";
pub const DUMMY_ARCHIVE: &str = "ubuntu";

pub fn builder(name: &str, virtualized: bool) -> BuilderConfig {
    BuilderConfig {
        name: name.to_string(),
        url: format!("http://{}.buildd:8221", name),
        processor: DUMMY_PROCESSOR.to_string(),
        virtualized,
        manual: false,
        reset_protocol: ResetProtocol::Proto1_1,
    }
}

pub fn async_builder(name: &str) -> BuilderConfig {
    BuilderConfig {
        reset_protocol: ResetProtocol::Proto2_0,
        ..builder(name, true)
    }
}

pub fn package_request(name: &str) -> BuildRequest {
    BuildRequest {
        job_type: JobType::PackageBuild,
        name: name.to_string(),
        version: "1.0-1".to_string(),
        processor: Some(DUMMY_PROCESSOR.to_string()),
        virtualized: None,
        archive: Archive::new(DUMMY_ARCHIVE, ArchivePurpose::Primary),
        pocket: Pocket::Release,
        component: Some("main".to_string()),
        urgency: Urgency::Medium,
        estimated_duration: Some(900),
        manual: false,
    }
}

pub fn snap_request(name: &str) -> BuildRequest {
    BuildRequest {
        job_type: JobType::SnapBuild,
        version: "0+git20260101".to_string(),
        archive: Archive::new("~snappy/ubuntu/ppa", ArchivePurpose::Ppa),
        component: None,
        estimated_duration: None,
        ..package_request(name)
    }
}
