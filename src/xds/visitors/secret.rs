//! DAG secrets → `envoy.extensions.transport_sockets.tls.v3.Secret`.

use std::collections::BTreeMap;

use envoy_types::pb::envoy::config::core::v3::DataSource;
use envoy_types::pb::envoy::extensions::transport_sockets::tls::v3::{
    secret::Type as SecretType, Secret as EnvoySecret, TlsCertificate,
};
use envoy_types::pb::google::protobuf::Any;
use prost::Message;

use crate::dag::Dag;
use crate::xds::cache::SECRET_TYPE_URL;

pub fn build(dag: &Dag) -> BTreeMap<String, Any> {
    let mut out = BTreeMap::new();

    for secret in dag.all_secrets() {
        let tls_certificate = TlsCertificate {
            certificate_chain: Some(DataSource {
                specifier: Some(envoy_types::pb::envoy::config::core::v3::data_source::Specifier::InlineBytes(
                    secret.certificate_chain.clone(),
                )),
                ..Default::default()
            }),
            private_key: Some(DataSource {
                specifier: Some(envoy_types::pb::envoy::config::core::v3::data_source::Specifier::InlineBytes(
                    secret.private_key.clone(),
                )),
                ..Default::default()
            }),
            ..Default::default()
        };

        let envoy_secret = EnvoySecret {
            name: secret.name.clone(),
            r#type: Some(SecretType::TlsCertificate(tls_certificate)),
        };

        out.insert(secret.name.clone(), Any { type_url: SECRET_TYPE_URL.to_string(), value: envoy_secret.encode_to_vec() });
    }

    out
}
