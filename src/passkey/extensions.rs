//! Extension negotiation
//!
//! Validates largeBlob, PRF and credProps inputs against the ceremony they are
//! attached to and converts outputs in both directions. Input validation is
//! strict; output conversion is lenient and simply omits absent blocks.

use std::collections::BTreeMap;

use log::warn;

use crate::error::{ErrorKind, PasskeyError};
use crate::webauthn::base64url;
use crate::webauthn::types::{
    CredentialPropertiesJson, ExtensionInputsJson, ExtensionOutputsJson, LargeBlobInputsJson,
    LargeBlobOutputsJson, PrfInputsJson, PrfOutputsJson, PrfValuesJson,
};

use super::model::{
    AssertionExtensionInputs, CredentialProperties, ExtensionOutputs, LargeBlobOperation,
    LargeBlobOutputs, LargeBlobSupport, PrfInputs, PrfOutputs, PrfValues,
    RegistrationExtensionInputs,
};

fn decode_field(value: &str, field: &str) -> Result<Vec<u8>, PasskeyError> {
    base64url::decode(value).map_err(|_| PasskeyError::invalid_encoding(field))
}

fn invalid_large_blob(message: &str) -> PasskeyError {
    PasskeyError::new(ErrorKind::InvalidLargeBlobInput, message)
}

fn invalid_prf(message: impl Into<String>) -> PasskeyError {
    PasskeyError::new(ErrorKind::InvalidPrfInput, message)
}

/// Validate registration extension inputs
///
/// # Errors
///
/// Returns `InvalidLargeBlobInput` if `read`/`write` is present or `support`
/// is not a known value, `InvalidPRFInput` if `evalByCredential` is present
/// (registrations have no allow-list), and `InvalidEncoding` for bad base64url.
pub fn registration_inputs_from_json(
    inputs: Option<&ExtensionInputsJson>,
) -> Result<RegistrationExtensionInputs, PasskeyError> {
    let Some(inputs) = inputs else {
        return Ok(RegistrationExtensionInputs::default());
    };

    let large_blob = match &inputs.large_blob {
        None => None,
        Some(large_blob) => {
            if large_blob.read.is_some() || large_blob.write.is_some() {
                return Err(invalid_large_blob(
                    "largeBlob 'read' and 'write' are only valid when getting a credential",
                ));
            }
            match large_blob.support.as_deref() {
                None => Some(LargeBlobSupport::Preferred),
                Some(support) => Some(LargeBlobSupport::from_wire(support).ok_or_else(|| {
                    invalid_large_blob("largeBlob 'support' must be 'preferred' or 'required'")
                })?),
            }
        }
    };

    let prf = inputs
        .prf
        .as_ref()
        .map(|prf| prf_inputs_from_json(prf, None))
        .transpose()?;

    Ok(RegistrationExtensionInputs {
        large_blob,
        prf,
        cred_props: inputs.cred_props.unwrap_or(false),
    })
}

/// Validate assertion extension inputs
///
/// `allow_credential_ids` are the `allowCredentials` ids exactly as they
/// appeared in the request JSON.
///
/// # Errors
///
/// Returns `InvalidLargeBlobInput` if `support` is present or both `read` and
/// `write` are requested, `InvalidPRFInput` if `evalByCredential` names a
/// credential outside the allow-list, and `InvalidEncoding` for bad base64url.
pub fn assertion_inputs_from_json(
    inputs: Option<&ExtensionInputsJson>,
    allow_credential_ids: &[String],
) -> Result<AssertionExtensionInputs, PasskeyError> {
    let Some(inputs) = inputs else {
        return Ok(AssertionExtensionInputs::default());
    };

    let large_blob = inputs
        .large_blob
        .as_ref()
        .map(large_blob_operation_from_json)
        .transpose()?
        .flatten();

    let prf = inputs
        .prf
        .as_ref()
        .map(|prf| prf_inputs_from_json(prf, Some(allow_credential_ids)))
        .transpose()?;

    if inputs.cred_props.is_some() {
        warn!("credProps is a registration extension; ignoring it on an assertion request");
    }

    Ok(AssertionExtensionInputs { large_blob, prf })
}

fn large_blob_operation_from_json(
    large_blob: &LargeBlobInputsJson,
) -> Result<Option<LargeBlobOperation>, PasskeyError> {
    if large_blob.support.is_some() {
        return Err(invalid_large_blob(
            "largeBlob 'support' is only valid when creating a credential",
        ));
    }
    let read = large_blob.read.unwrap_or(false);
    match (read, large_blob.write.as_deref()) {
        (true, Some(_)) => Err(invalid_large_blob(
            "largeBlob 'read' and 'write' cannot be requested together",
        )),
        (true, None) => Ok(Some(LargeBlobOperation::Read)),
        (false, Some(blob)) => Ok(Some(LargeBlobOperation::Write(decode_field(
            blob,
            "extensions.largeBlob.write",
        )?))),
        (false, None) => Ok(None),
    }
}

/// `allow_credential_ids` is `None` for registrations, which never have an allow-list
fn prf_inputs_from_json(
    prf: &PrfInputsJson,
    allow_credential_ids: Option<&[String]>,
) -> Result<PrfInputs, PasskeyError> {
    let eval = prf
        .eval
        .as_ref()
        .map(|values| prf_values_from_json(values, "extensions.prf.eval"))
        .transpose()?;

    let mut eval_by_credential = BTreeMap::new();
    if let Some(entries) = &prf.eval_by_credential {
        let allowed = allow_credential_ids.unwrap_or_default();
        if allowed.is_empty() {
            return Err(invalid_prf(
                "'evalByCredential' requires a non-empty 'allowCredentials' list",
            ));
        }
        for (credential_id, values) in entries {
            if credential_id.is_empty() {
                return Err(invalid_prf("'evalByCredential' keys must not be empty"));
            }
            if !allowed.iter().any(|allowed_id| allowed_id == credential_id) {
                return Err(invalid_prf(format!(
                    "'evalByCredential' key '{credential_id}' does not match any 'allowCredentials' id"
                )));
            }
            let raw_id = decode_field(credential_id, "extensions.prf.evalByCredential")?;
            let values = prf_values_from_json(values, "extensions.prf.evalByCredential")?;
            eval_by_credential.insert(raw_id, values);
        }
    }

    Ok(PrfInputs {
        eval,
        eval_by_credential,
    })
}

fn prf_values_from_json(values: &PrfValuesJson, field: &str) -> Result<PrfValues, PasskeyError> {
    Ok(PrfValues {
        first: decode_field(&values.first, field)?,
        second: values
            .second
            .as_deref()
            .map(|second| decode_field(second, field))
            .transpose()?,
    })
}

fn prf_values_to_json(values: &PrfValues) -> PrfValuesJson {
    PrfValuesJson {
        first: base64url::encode(&values.first),
        second: values.second.as_deref().map(base64url::encode),
    }
}

fn prf_inputs_to_json(prf: &PrfInputs) -> PrfInputsJson {
    PrfInputsJson {
        eval: prf.eval.as_ref().map(prf_values_to_json),
        eval_by_credential: if prf.eval_by_credential.is_empty() {
            None
        } else {
            Some(
                prf.eval_by_credential
                    .iter()
                    .map(|(id, values)| (base64url::encode(id), prf_values_to_json(values)))
                    .collect(),
            )
        },
    }
}

/// Convert registration inputs back to wire form; `None` when nothing is requested
#[must_use]
pub fn registration_inputs_to_json(
    inputs: &RegistrationExtensionInputs,
) -> Option<ExtensionInputsJson> {
    if inputs.requested().is_empty() {
        return None;
    }
    Some(ExtensionInputsJson {
        large_blob: inputs.large_blob.map(|support| LargeBlobInputsJson {
            support: Some(support.as_str().to_string()),
            ..LargeBlobInputsJson::default()
        }),
        prf: inputs.prf.as_ref().map(prf_inputs_to_json),
        cred_props: inputs.cred_props.then_some(true),
    })
}

/// Convert assertion inputs back to wire form; `None` when nothing is requested
#[must_use]
pub fn assertion_inputs_to_json(inputs: &AssertionExtensionInputs) -> Option<ExtensionInputsJson> {
    if inputs.requested().is_empty() {
        return None;
    }
    Some(ExtensionInputsJson {
        large_blob: inputs.large_blob.as_ref().map(|operation| match operation {
            LargeBlobOperation::Read => LargeBlobInputsJson {
                read: Some(true),
                ..LargeBlobInputsJson::default()
            },
            LargeBlobOperation::Write(blob) => LargeBlobInputsJson {
                write: Some(base64url::encode(blob)),
                ..LargeBlobInputsJson::default()
            },
        }),
        prf: inputs.prf.as_ref().map(prf_inputs_to_json),
        cred_props: None,
    })
}

/// Convert provider outputs to wire form, omitting every absent block
#[must_use]
pub fn outputs_to_json(outputs: &ExtensionOutputs) -> ExtensionOutputsJson {
    ExtensionOutputsJson {
        large_blob: outputs
            .large_blob
            .as_ref()
            .map(|large_blob| LargeBlobOutputsJson {
                supported: large_blob.supported,
                blob: large_blob.blob.as_deref().map(base64url::encode),
                written: large_blob.written,
            }),
        prf: outputs.prf.as_ref().map(|prf| PrfOutputsJson {
            enabled: prf.enabled,
            results: prf.results.as_ref().map(prf_values_to_json),
        }),
        cred_props: outputs
            .cred_props
            .map(|props| CredentialPropertiesJson { rk: props.rk }),
    }
}

/// Convert wire outputs reported by a JSON-native provider
///
/// # Errors
///
/// Returns `InvalidEncoding` if a blob or PRF result is not valid base64url.
pub fn outputs_from_json(outputs: &ExtensionOutputsJson) -> Result<ExtensionOutputs, PasskeyError> {
    let large_blob = match &outputs.large_blob {
        None => None,
        Some(large_blob) => Some(LargeBlobOutputs {
            supported: large_blob.supported,
            blob: large_blob
                .blob
                .as_deref()
                .map(|blob| decode_field(blob, "clientExtensionResults.largeBlob.blob"))
                .transpose()?,
            written: large_blob.written,
        }),
    };
    let prf = match &outputs.prf {
        None => None,
        Some(prf) => Some(PrfOutputs {
            enabled: prf.enabled,
            results: prf
                .results
                .as_ref()
                .map(|values| prf_values_from_json(values, "clientExtensionResults.prf.results"))
                .transpose()?,
        }),
    };
    Ok(ExtensionOutputs {
        large_blob,
        prf,
        cred_props: outputs
            .cred_props
            .as_ref()
            .map(|props| CredentialProperties { rk: props.rk }),
    })
}

/// Requested extensions for which the provider produced no output
#[must_use]
pub fn missing_outputs(requested: &[&'static str], outputs: &ExtensionOutputs) -> Vec<&'static str> {
    requested
        .iter()
        .copied()
        .filter(|name| !outputs.contains(name))
        .collect()
}
