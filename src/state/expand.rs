//! Service archetype expansion.
//!
//! Each archetype has its own expansion function. All of them emit entries
//! in a fixed order and bind every entry to the caller-supplied principal;
//! identity keys are assigned by the resolver afterwards.

use crate::config::{
    ApplicationService, ConnectorDetails, KafkaConnectService, KafkaStreamsService, ServiceDetails,
};

use super::types::{AclDetails, AclOperation};

/// Options shared by every archetype.
#[derive(Debug, Clone, Copy)]
pub struct ExpandOptions<'a> {
    /// Name of the service being expanded.
    pub service_name: &'a str,
    /// Also emit DESCRIBE for produced and consumed topics.
    pub describe_acl_enabled: bool,
}

/// Expands a service into its access entries.
#[must_use]
pub fn expand_service(
    service: &ServiceDetails,
    principal: &str,
    options: ExpandOptions<'_>,
) -> Vec<AclDetails> {
    match service {
        ServiceDetails::Application(app) => expand_application(app, principal, options),
        ServiceDetails::KafkaConnect(connect) => expand_connect(connect, principal, options),
        ServiceDetails::KafkaStreams(streams) => expand_streams(streams, principal, options),
    }
}

fn expand_application(
    app: &ApplicationService,
    principal: &str,
    options: ExpandOptions<'_>,
) -> Vec<AclDetails> {
    let group = app.group_id.as_deref().unwrap_or(options.service_name);
    client_acls(&app.produces, &app.consumes, group, principal, options)
}

fn expand_streams(
    streams: &KafkaStreamsService,
    principal: &str,
    options: ExpandOptions<'_>,
) -> Vec<AclDetails> {
    let mut acls = produce_acls(&streams.produces, principal, options);
    acls.extend(consume_acls(&streams.consumes, principal, options));
    acls
}

fn expand_connect(
    connect: &KafkaConnectService,
    principal: &str,
    options: ExpandOptions<'_>,
) -> Vec<AclDetails> {
    let name = options.service_name;
    let storage = connect.storage_topics.as_ref();
    let config_topic = storage
        .and_then(|t| t.config.clone())
        .unwrap_or_else(|| format!("connect-configs-{name}"));
    let offset_topic = storage
        .and_then(|t| t.offset.clone())
        .unwrap_or_else(|| format!("connect-offsets-{name}"));
    let status_topic = storage
        .and_then(|t| t.status.clone())
        .unwrap_or_else(|| format!("connect-status-{name}"));
    let group = connect.group_id.as_deref().unwrap_or(name);

    let mut acls = produce_acls(&connect.produces, principal, options);

    let storage_topics = [&config_topic, &offset_topic, &status_topic];
    for operation in [AclOperation::Read, AclOperation::Write] {
        for topic in storage_topics {
            acls.push(AclDetails::topic(topic, principal, operation));
        }
    }
    acls.push(AclDetails::group(group, principal, AclOperation::Read));

    for (connector_name, connector) in &connect.connectors {
        acls.extend(expand_connector(connector_name, connector, principal, options));
    }
    acls
}

fn expand_connector(
    connector_name: &str,
    connector: &ConnectorDetails,
    principal: &str,
    options: ExpandOptions<'_>,
) -> Vec<AclDetails> {
    let group = format!("connect-{connector_name}");
    client_acls(&connector.produces, &connector.consumes, &group, principal, options)
}

fn client_acls(
    produces: &[String],
    consumes: &[String],
    group: &str,
    principal: &str,
    options: ExpandOptions<'_>,
) -> Vec<AclDetails> {
    let mut acls = produce_acls(produces, principal, options);
    acls.extend(consume_acls(consumes, principal, options));
    if !consumes.is_empty() {
        acls.push(AclDetails::group(group, principal, AclOperation::Read));
    }
    acls
}

fn produce_acls(topics: &[String], principal: &str, options: ExpandOptions<'_>) -> Vec<AclDetails> {
    topic_acls(topics, principal, AclOperation::Write, options.describe_acl_enabled)
}

fn consume_acls(topics: &[String], principal: &str, options: ExpandOptions<'_>) -> Vec<AclDetails> {
    topic_acls(topics, principal, AclOperation::Read, options.describe_acl_enabled)
}

fn topic_acls(
    topics: &[String],
    principal: &str,
    operation: AclOperation,
    describe: bool,
) -> Vec<AclDetails> {
    let mut acls: Vec<AclDetails> = topics
        .iter()
        .map(|topic| AclDetails::topic(topic, principal, operation))
        .collect();
    if describe {
        acls.extend(
            topics
                .iter()
                .map(|topic| AclDetails::topic(topic, principal, AclOperation::Describe)),
        );
    }
    acls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageTopics;
    use crate::state::ResourceType;

    const PRINCIPAL: &str = "User:svc";

    fn options(name: &str) -> ExpandOptions<'_> {
        ExpandOptions {
            service_name: name,
            describe_acl_enabled: false,
        }
    }

    fn has(acls: &[AclDetails], resource_type: ResourceType, name: &str, op: AclOperation) -> bool {
        acls.iter()
            .any(|a| a.resource_type == resource_type && a.name == name && a.operation == op)
    }

    #[test]
    fn test_connect_service_expansion() {
        let service = ServiceDetails::KafkaConnect(KafkaConnectService {
            produces: vec![String::from("orders")],
            ..KafkaConnectService::default()
        });
        let acls = expand_service(&service, PRINCIPAL, options("my-connect"));

        assert_eq!(acls[0], AclDetails::topic("orders", PRINCIPAL, AclOperation::Write));
        for topic in [
            "connect-configs-my-connect",
            "connect-offsets-my-connect",
            "connect-status-my-connect",
        ] {
            assert!(has(&acls, ResourceType::Topic, topic, AclOperation::Read));
            assert!(has(&acls, ResourceType::Topic, topic, AclOperation::Write));
        }
        assert!(has(&acls, ResourceType::Group, "my-connect", AclOperation::Read));
        assert_eq!(acls.len(), 8);
        assert!(acls.iter().all(|a| a.principal == PRINCIPAL));
    }

    #[test]
    fn test_connect_overrides_and_connectors() {
        let mut connectors = std::collections::BTreeMap::new();
        connectors.insert(
            String::from("jdbc-sink"),
            ConnectorDetails {
                produces: vec![],
                consumes: vec![String::from("payments")],
            },
        );
        let service = ServiceDetails::KafkaConnect(KafkaConnectService {
            group_id: Some(String::from("workers")),
            storage_topics: Some(StorageTopics {
                config: Some(String::from("cfg")),
                offset: None,
                status: None,
            }),
            connectors,
            ..KafkaConnectService::default()
        });
        let acls = expand_service(&service, PRINCIPAL, options("c"));

        assert!(has(&acls, ResourceType::Topic, "cfg", AclOperation::Read));
        assert!(has(&acls, ResourceType::Topic, "connect-offsets-c", AclOperation::Write));
        assert!(has(&acls, ResourceType::Group, "workers", AclOperation::Read));
        assert!(has(&acls, ResourceType::Topic, "payments", AclOperation::Read));
        assert!(has(&acls, ResourceType::Group, "connect-jdbc-sink", AclOperation::Read));
    }

    #[test]
    fn test_application_describe_mode() {
        let service = ServiceDetails::Application(ApplicationService {
            produces: vec![String::from("out")],
            consumes: vec![String::from("in")],
            ..ApplicationService::default()
        });
        let acls = expand_service(
            &service,
            PRINCIPAL,
            ExpandOptions {
                service_name: "app",
                describe_acl_enabled: true,
            },
        );

        assert_eq!(acls.len(), 5);
        assert!(has(&acls, ResourceType::Topic, "out", AclOperation::Describe));
        assert!(has(&acls, ResourceType::Topic, "in", AclOperation::Describe));
        assert!(has(&acls, ResourceType::Group, "app", AclOperation::Read));
    }

    #[test]
    fn test_producer_only_has_no_group() {
        let service = ServiceDetails::Application(ApplicationService {
            produces: vec![String::from("out")],
            ..ApplicationService::default()
        });
        let acls = expand_service(&service, PRINCIPAL, options("app"));
        assert_eq!(acls, vec![AclDetails::topic("out", PRINCIPAL, AclOperation::Write)]);
    }

    #[test]
    fn test_streams_without_topics_is_empty() {
        let service = ServiceDetails::KafkaStreams(KafkaStreamsService::default());
        assert!(expand_service(&service, PRINCIPAL, options("enricher")).is_empty());
    }
}
