use std::sync::Arc;

use credential_scram::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

struct TestDirectory {
    entries: MemoryDirectory,
}

impl TestDirectory {
    pub fn new() -> Self {
        let mut rng = StdRng::seed_from_u64(1);
        let verifier = verifier();
        let mut entries = MemoryDirectory::new();
        entries.insert("user", verifier.issue_with_rng("password", "$6$", &mut rng).unwrap());
        entries.insert("admin", verifier.issue_with_rng("admin_password", "$2b$", &mut rng).unwrap());
        entries.insert("legacy", verifier.issue_with_rng("legacy_password", "$5$", &mut rng).unwrap());
        TestDirectory { entries }
    }
}

impl CredentialDirectory for TestDirectory {
    fn lookup_credential(&self, username: &str) -> Lookup {
        self.entries.lookup_credential(username)
    }

    fn authorize(&self, authcid: &str, authzid: &str) -> bool {
        authcid == authzid || authcid == "admin" && authzid == "user"
    }
}

fn verifier() -> Verifier {
    let config = Config {
        bcrypt_cost: 4,
        sha_crypt_rounds: 1000,
        ..Config::default()
    };
    Verifier::new(Arc::new(SchemeRegistry::from_config(&config)))
}

fn server() -> ScramServer<TestDirectory> {
    ScramServer::new(verifier(), TestDirectory::new())
}

/// The client side of the exchange. It knows which scheme the user's credential has.
struct TestClient<'a> {
    scheme: Scheme,
    password: &'a str,
    gs2_header: String,
    client_first_bare: String,
}

impl<'a> TestClient<'a> {
    fn new(scheme: Scheme, user: &str, password: &'a str, authzid: Option<&str>) -> Self {
        let gs2_header = match authzid {
            Some(authzid) => format!("n,a={},", authzid),
            None => "n,,".to_string(),
        };
        TestClient {
            scheme,
            password,
            gs2_header,
            client_first_bare: format!("n={},r=abc123", user),
        }
    }

    fn client_first(&self) -> String {
        format!("{}{}", self.gs2_header, self.client_first_bare)
    }

    /// Returns the client final message and the expected server signature.
    fn client_final(&self, server_first: &ChallengeResponse) -> (String, String) {
        let nonce = server_first.get(Attribute::Nonce).unwrap();
        let salt = base64::decode(server_first.get(Attribute::Salt).unwrap()).unwrap();
        let iterations = server_first.get(Attribute::IterationCount).unwrap().parse().unwrap();
        let salted_password = self.scheme.compute_hash(self.password.as_bytes(), &salt, iterations).unwrap();

        let without_proof = format!("c={},r={}", base64::encode(self.gs2_header.as_bytes()), nonce);
        let auth_message = auth_message(&self.client_first_bare, &server_first.to_string(), &without_proof);
        let (proof, signature) = find_proofs(&salted_password, &auth_message).unwrap();
        (format!("{},p={}", without_proof, base64::encode(&proof[..])),
         format!("v={}", base64::encode(&signature[..])))
    }
}

fn exchange(server: &ScramServer<TestDirectory>, client: &TestClient<'_>) -> (Result<(), Error>, String, String) {
    let mut session = server.start();
    session.handle_response(&client.client_first()).unwrap();
    let server_first = session.produce_challenge().unwrap().unwrap();
    let (client_final, expected_signature) = client.client_final(&server_first);
    let result = session.handle_response(&client_final);
    let server_final = session.produce_challenge().unwrap().unwrap().to_string();
    assert!(session.produce_challenge().unwrap().is_none());
    assert_eq!(session.is_complete(), result.is_ok());
    (result, server_final, expected_signature)
}

#[test]
fn test_simple_success() {
    let server = server();
    let client = TestClient::new(Scheme::ShaCrypt(ShaVariant::Sha512), "user", "password", None);
    let (result, server_final, expected) = exchange(&server, &client);
    result.unwrap();
    assert_eq!(server_final, expected);
}

#[test]
fn test_bcrypt_and_sha256_users() {
    let server = server();
    let admin = TestClient::new(Scheme::Bcrypt(BcryptVersion::V2b), "admin", "admin_password", None);
    let (result, server_final, expected) = exchange(&server, &admin);
    result.unwrap();
    assert_eq!(server_final, expected);

    let legacy = TestClient::new(Scheme::ShaCrypt(ShaVariant::Sha256), "legacy", "legacy_password", None);
    let (result, server_final, expected) = exchange(&server, &legacy);
    result.unwrap();
    assert_eq!(server_final, expected);
}

#[test]
fn test_bad_password() {
    let server = server();
    let client = TestClient::new(Scheme::ShaCrypt(ShaVariant::Sha512), "user", "badpassword", None);
    let (result, server_final, _) = exchange(&server, &client);
    assert_eq!(result.unwrap_err(), Error::Authentication);
    assert_eq!(server_final, "e=invalid-proof");
}

#[test]
fn test_unknown_user_looks_like_bad_password() {
    let server = server();
    let client = TestClient::new(Scheme::ShaCrypt(ShaVariant::Sha512), "nobody", "password", None);
    let (result, server_final, _) = exchange(&server, &client);
    assert_eq!(result.unwrap_err(), Error::Authentication);
    assert_eq!(server_final, "e=invalid-proof");

    // The decoy challenge is shaped like a real one and stable across attempts.
    let challenge = |user: &str| {
        let mut session = server.start();
        session.handle_response(&format!("n,,n={},r=abc123", user)).unwrap();
        session.produce_challenge().unwrap().unwrap()
    };
    let first = challenge("nobody");
    let second = challenge("nobody");
    assert_eq!(first.get(Attribute::Salt), second.get(Attribute::Salt));
    assert_eq!(first.get(Attribute::IterationCount), Some("1000"));
    let real = challenge("user");
    assert_eq!(base64::decode(first.get(Attribute::Salt).unwrap()).unwrap().len(),
               base64::decode(real.get(Attribute::Salt).unwrap()).unwrap().len());
}

#[test]
fn test_challenge_matches_stored_credential() {
    let server = server();
    let record = match server.directory().lookup_credential("admin") {
        Lookup::Found(encoded) => server.verifier().parse(&encoded).unwrap(),
        Lookup::NotFound => panic!("admin missing"),
    };
    let mut session = server.start();
    session.handle_response("n,,n=admin,r=abc123").unwrap();
    let challenge = session.produce_challenge().unwrap().unwrap();
    let nonce = challenge.get(Attribute::Nonce).unwrap();
    assert!(nonce.starts_with("abc123"));
    assert_eq!(nonce.len(), "abc123".len() + DEFAULT_NONCE_LENGTH);
    assert_eq!(challenge.get(Attribute::Salt), Some(base64::encode(record.salt()).as_str()));
    assert_eq!(challenge.get(Attribute::IterationCount), Some(record.cost().to_string().as_str()));
    assert_eq!(session.context().combined_nonce(), nonce);
    assert_eq!(session.context().server_nonce().len(), DEFAULT_NONCE_LENGTH);
}

#[test]
fn test_authorize_different() {
    let server = server();
    let client = TestClient::new(Scheme::Bcrypt(BcryptVersion::V2b), "admin", "admin_password", Some("user"));
    let (result, server_final, expected) = exchange(&server, &client);
    result.unwrap();
    assert_eq!(server_final, expected);
}

#[test]
fn test_authorize_fail() {
    let server = server();
    let client = TestClient::new(Scheme::ShaCrypt(ShaVariant::Sha512), "user", "password", Some("admin"));
    let (result, server_final, _) = exchange(&server, &client);
    assert_eq!(result.unwrap_err(),
               Error::Authorization {
                   authcid: "user".to_string(),
                   authzid: "admin".to_string(),
               });
    assert_eq!(server_final, "e=other-error");
}

#[test]
fn test_tampered_client_final() {
    let server = server();
    let client = TestClient::new(Scheme::ShaCrypt(ShaVariant::Sha512), "user", "password", None);

    let mut session = server.start();
    session.handle_response(&client.client_first()).unwrap();
    let server_first = session.produce_challenge().unwrap().unwrap();
    let (client_final, _) = client.client_final(&server_first);
    let nonce = server_first.get(Attribute::Nonce).unwrap();
    let tampered = client_final.replacen(nonce, &format!("{}x", nonce), 1);
    assert_eq!(session.handle_response(&tampered).unwrap_err(), Error::Protocol(Kind::InvalidNonce));
    assert_eq!(session.phase(), Phase::Failed);

    let mut session = server.start();
    session.handle_response(&client.client_first()).unwrap();
    let server_first = session.produce_challenge().unwrap().unwrap();
    let (client_final, _) = client.client_final(&server_first);
    let tampered = client_final.replacen("c=biws", "c=eSws", 1);
    assert_eq!(session.handle_response(&tampered).unwrap_err(),
               Error::Protocol(Kind::InvalidField(Field::ChannelBinding)));
    assert_eq!(session.produce_challenge().unwrap().unwrap().to_string(),
               "e=channel-bindings-dont-match");
}

#[test]
fn test_wrong_proof_with_correct_nonce() {
    let server = server();
    let client = TestClient::new(Scheme::ShaCrypt(ShaVariant::Sha512), "user", "password", None);
    let mut session = server.start();
    session.handle_response(&client.client_first()).unwrap();
    let server_first = session.produce_challenge().unwrap().unwrap();
    let (client_final, _) = client.client_final(&server_first);

    let (without_proof, proof) = client_final.split_at(client_final.find(",p=").unwrap());
    let mut proof = base64::decode(&proof[3..]).unwrap();
    proof[0] ^= 0x01;
    let forged = format!("{},p={}", without_proof, base64::encode(&proof));
    assert_eq!(session.handle_response(&forged).unwrap_err(), Error::Authentication);
    assert_eq!(session.produce_challenge().unwrap().unwrap().to_string(), "e=invalid-proof");
    assert!(!session.is_complete());
}

#[test]
fn test_client_first_resent_during_validation() {
    let server = server();
    let client = TestClient::new(Scheme::ShaCrypt(ShaVariant::Sha512), "user", "password", None);
    let mut session = server.start();
    session.handle_response(&client.client_first()).unwrap();
    session.produce_challenge().unwrap().unwrap();
    assert_eq!(session.handle_response(&client.client_first()).unwrap_err(),
               Error::ProtocolSequence("Validation"));
    assert_eq!(session.phase(), Phase::Failed);
}

#[test]
fn test_messages_after_completion_are_rejected() {
    let server = server();
    let client = TestClient::new(Scheme::ShaCrypt(ShaVariant::Sha512), "user", "password", None);
    let mut session = server.start();
    session.handle_response(&client.client_first()).unwrap();
    let server_first = session.produce_challenge().unwrap().unwrap();
    let (client_final, _) = client.client_final(&server_first);
    session.handle_response(&client_final).unwrap();
    assert_eq!(session.phase(), Phase::Completed);

    assert_eq!(session.handle_response(&client_final).unwrap_err(), Error::ProtocolSequence("Completed"));
    assert_eq!(session.handle_response(&client.client_first()).unwrap_err(),
               Error::ProtocolSequence("Completed"));
    assert!(session.is_complete());
    assert!(session.produce_challenge().unwrap().unwrap().get(Attribute::Verifier).is_some());
}

#[test]
fn test_messages_after_failure_are_rejected() {
    let server = server();
    let mut session = server.start();
    assert!(session.handle_response("c=biws,r=abc123,p=AAAA").is_err());
    assert_eq!(session.handle_response("n,,n=user,r=abc123").unwrap_err(), Error::ProtocolSequence("Failed"));
    assert!(!session.is_complete());
}

#[test]
fn test_verify_user_against_directory() {
    let server = server();
    let verifier = server.verifier();
    verifier.verify_user(server.directory(), "admin", "admin_password").unwrap();
    assert_eq!(verifier.verify_user(server.directory(), "admin", "nope").unwrap_err(), Error::Authentication);
    assert!(verifier.verify_user(server.directory(), "nobody", "nope").unwrap_err().is_authentication_failure());
}
