use hmac::digest::generic_array::GenericArray;
use hmac::digest::FixedOutput;
use hmac::{Hmac, Mac};
use rand::Rng;
use ring::digest::SHA256_OUTPUT_LEN;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::Error;

type HmacSha256 = Hmac<Sha256>;
type Sha256Buffer = Zeroizing<[u8; SHA256_OUTPUT_LEN]>;

/// Generates `length` printable ASCII characters, excluding `,`, for use in a nonce.
pub fn generate_nonce<R: Rng>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| {
            let x: u8 = rng.gen_range(33..125);
            if x > 43 {
                (x + 1) as char
            } else {
                x as char
            }
        })
        .collect()
}

/// Builds the SCRAM auth message from its three parts.
pub fn auth_message(client_first_bare: &str,
                    server_first: &str,
                    client_final_without_proof: &str)
                    -> String {
    format!("{},{},{}", client_first_bare, server_first, client_final_without_proof)
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Sha256Buffer, Error> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| Error::Primitive(e.to_string()))?;
    mac.update(data);
    let mut out = Zeroizing::new([0u8; SHA256_OUTPUT_LEN]);
    FixedOutput::finalize_into(mac, GenericArray::from_mut_slice(&mut out[..]));
    Ok(out)
}

fn sha256(data: &[u8]) -> Sha256Buffer {
    let mut hasher = Sha256::new();
    Digest::update(&mut hasher, data);
    let mut out = Zeroizing::new([0u8; SHA256_OUTPUT_LEN]);
    Digest::finalize_into(hasher, GenericArray::from_mut_slice(&mut out[..]));
    out
}

/// Finds the client proof and server signature based on the salted password, which is the
/// stored digest of the user's credential.
///
/// Client key, server key, stored key and client signature live in buffers that are wiped on
/// every return. The compression state inside the consumed `Hmac` and `Sha256` values is not
/// wiped.
pub fn find_proofs(salted_password: &[u8],
                   auth_message: &str)
                   -> Result<(Sha256Buffer, [u8; SHA256_OUTPUT_LEN]), Error> {
    let client_key = hmac_sha256(salted_password, b"Client Key")?;
    let server_key = hmac_sha256(salted_password, b"Server Key")?;
    let stored_key = sha256(&client_key[..]);
    let client_signature = hmac_sha256(&stored_key[..], auth_message.as_bytes())?;
    let server_signature = hmac_sha256(&server_key[..], auth_message.as_bytes())?;
    let mut client_proof = Zeroizing::new([0u8; SHA256_OUTPUT_LEN]);
    let xor_iter = client_key.iter().zip(client_signature.iter()).map(|(k, s)| k ^ s);
    for (p, x) in client_proof.iter_mut().zip(xor_iter) {
        *p = x
    }
    Ok((client_proof, *server_signature))
}
