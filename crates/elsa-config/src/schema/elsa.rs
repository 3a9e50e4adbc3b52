//! The schema of an Elsa Data deployment's configuration.

use once_cell::sync::Lazy;

use super::types::{ObjectSchema, Property, Schema};
use crate::value::ConfigValue;

/// Log levels accepted by `logger.level`.
pub const LOG_LEVELS: [&str; 7] = ["trace", "debug", "info", "warn", "error", "fatal", "silent"];

static ELSA_SCHEMA: Lazy<Schema> = Lazy::new(build_elsa_schema);

/// The schema every resolved Elsa configuration is validated against.
pub fn elsa_schema() -> &'static Schema {
    &ELSA_SCHEMA
}

fn empty_list() -> ConfigValue {
    ConfigValue::Array(Vec::new())
}

fn flag() -> Property {
    Property::optional(Schema::Boolean)
}

fn build_elsa_schema() -> Schema {
    Schema::object(
        ObjectSchema::new()
            .property(
                "serviceDiscoveryNamespace",
                Property::optional(Schema::non_empty_string())
                    .default_value("elsa-data")
                    .describe("Cloud Map namespace used to find sibling services"),
            )
            .property(
                "deployedUrl",
                Property::required(Schema::url())
                    .describe("Public URL the application is reachable at"),
            )
            .property("aws", Property::optional(aws()))
            .property("httpHosting", Property::required(http_hosting()))
            .property(
                "logger",
                Property::optional(logger()).default_value(ConfigValue::empty_map()),
            )
            .property("oidc", Property::optional(oidc()))
            .property("mailer", Property::optional(mailer()))
            .property(
                "datasets",
                Property::optional(datasets()).default_value(empty_list()),
            )
            .property("dacs", Property::optional(dacs()).default_value(empty_list()))
            .property(
                "superAdmins",
                Property::optional(super_admins()).default_value(empty_list()),
            )
            .property("devTesting", Property::optional(dev_testing())),
    )
}

fn aws() -> Schema {
    Schema::object(ObjectSchema::new().property(
        "tempBucket",
        Property::optional(Schema::non_empty_string())
            .describe("Bucket for transient files such as manifests"),
    ))
}

fn http_hosting() -> Schema {
    let session = ObjectSchema::new()
        .property(
            "secret",
            Property::required(Schema::non_empty_string()).sensitive(),
        )
        .property(
            "salt",
            Property::required(Schema::string().min_length(16)).sensitive(),
        )
        .property(
            "maxAge",
            Property::optional(Schema::integer().minimum(1)).describe("Session lifetime in seconds"),
        );

    Schema::object(
        ObjectSchema::new()
            .property(
                "host",
                Property::optional(Schema::ip_address()).default_value("127.0.0.1"),
            )
            .property(
                "port",
                Property::optional(Schema::integer().range(1, 65535)).default_value(3000_i64),
            )
            .property("session", Property::required(Schema::object(session))),
    )
}

fn logger() -> Schema {
    Schema::object(ObjectSchema::new().property(
        "level",
        Property::optional(Schema::one_of(LOG_LEVELS)).default_value("info"),
    ))
}

fn oidc() -> Schema {
    Schema::object(
        ObjectSchema::new()
            .property("issuerUrl", Property::required(Schema::url()))
            .property("clientId", Property::required(Schema::non_empty_string()))
            .property(
                "clientSecret",
                Property::required(Schema::non_empty_string()).sensitive(),
            ),
    )
}

fn mailer() -> Schema {
    Schema::union(
        "mode",
        [
            (
                "SES",
                ObjectSchema::new()
                    .property("options", Property::optional(Schema::Any))
                    .property("defaults", Property::optional(Schema::Any)),
            ),
            (
                "SMTP",
                ObjectSchema::new()
                    .property("options", Property::required(Schema::Any))
                    .property("defaults", Property::optional(Schema::Any)),
            ),
        ],
    )
}

fn datasets() -> Schema {
    let dataset = ObjectSchema::new()
        .property(
            "uri",
            Property::required(Schema::non_empty_string())
                .describe("Globally unique identifier of the dataset"),
        )
        .property("name", Property::optional(Schema::non_empty_string()))
        .property("description", Property::optional(Schema::string()))
        .property("loader", Property::optional(Schema::non_empty_string()));

    Schema::array_of(Schema::object(dataset))
        .unique_by("uri")
        .into()
}

fn dacs() -> Schema {
    let common = || {
        ObjectSchema::new()
            .property("id", Property::required(Schema::non_empty_string()))
            .property("description", Property::optional(Schema::string()))
    };

    let dac = Schema::union(
        "type",
        [
            ("manual", common()),
            (
                "redcap-australian-genomics-csv",
                common()
                    .property("identifierSystem", Property::optional(Schema::non_empty_string()))
                    .property("csvFlagshipDatasets", Property::optional(Schema::Any)),
            ),
            (
                "rems",
                common()
                    .property("url", Property::required(Schema::url()))
                    .property("botUser", Property::required(Schema::non_empty_string()))
                    .property(
                        "botKey",
                        Property::required(Schema::non_empty_string()).sensitive(),
                    ),
            ),
        ],
    );

    Schema::array_of(dac).unique_by("id").into()
}

fn super_admins() -> Schema {
    let admin = ObjectSchema::new()
        .property(
            "sub",
            Property::required(Schema::non_empty_string()).describe("OIDC subject identifier"),
        )
        .property("id", Property::optional(Schema::string()))
        .property("email", Property::optional(Schema::string()));

    Schema::array_of(Schema::object(admin))
        .unique_by("sub")
        .into()
}

fn dev_testing() -> Schema {
    Schema::object(
        ObjectSchema::new()
            .property("allowTestUsers", flag())
            .property("allowTestRoutes", flag())
            .property("mockAwsCloud", flag())
            .property("sourceFrontEndDirect", flag()),
    )
}
