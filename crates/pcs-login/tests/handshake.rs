use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use pcs_login::{
    CancellationToken, CodePresenter, CredentialStore, LoginConfig, LoginError, QrLogin,
    ScannableCode,
};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

#[derive(Default)]
struct RecordingStore {
    calls: Mutex<Vec<(String, String, String, String)>>,
}

#[async_trait]
impl CredentialStore for RecordingStore {
    async fn setup_user_by_bduss(
        &self,
        bduss: &str,
        ptoken: &str,
        stoken: &str,
        cookies: &str,
    ) -> pcs_login::Result<()> {
        self.calls.lock().unwrap().push((
            bduss.to_string(),
            ptoken.to_string(),
            stoken.to_string(),
            cookies.to_string(),
        ));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingPresenter {
    codes: Mutex<Vec<ScannableCode>>,
}

#[async_trait]
impl CodePresenter for RecordingPresenter {
    async fn present(&self, code: &ScannableCode) -> pcs_login::Result<()> {
        self.codes.lock().unwrap().push(code.clone());
        Ok(())
    }
}

fn callback_of(request: &Request) -> String {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == "callback")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

fn query_of(request: &Request) -> HashMap<String, String> {
    request.url.query_pairs().into_owned().collect()
}

fn number(query: &HashMap<String, String>, key: &str) -> i64 {
    query[key].parse().unwrap()
}

/// Responds with `payload` wrapped in the callback named by the request,
/// followed by more script the way the passport pages do.
fn jsonp(payload: String) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync {
    move |request: &Request| {
        ResponseTemplate::new(200).set_body_string(format!(
            "{}({});\nwindow.bd && bd.done();",
            callback_of(request),
            payload
        ))
    }
}

fn channel_payload(channel: serde_json::Value) -> String {
    json!({ "errno": 0, "channel_v": channel.to_string() }).to_string()
}

const SESSION_PAYLOAD: &str = r#"bd__cbs__ay6xvs(  {'errInfo':{'no':'0','msg':''},'data':{'session':{'bduss':'BDUSS_VALUE','ptoken':'PTOKEN_VALUE','stoken':'TOP_LEVEL_STOKEN','stokenList':'&quot;tb#TB_TOKEN&quot;,&quot;netdisk#NETDISK_STOKEN&quot;,&quot;pp#PP_TOKEN&quot;','displayname':'user\/name'}}}  )"#;

fn test_config(server: &MockServer) -> LoginConfig {
    LoginConfig::default()
        .with_passport_base(server.uri())
        .with_poll_interval(Duration::from_millis(10))
}

async fn mount_code(server: &MockServer, errno: i64, expected: u64) {
    let payload = json!({
        "imgurl": "//passport.baidu.com/v2/api/qrcode?sign=SIGN1",
        "errno": errno,
        "sign": "SIGN1",
    })
    .to_string();
    Mock::given(method("GET"))
        .and(path("/v2/api/getqrcode"))
        .and(query_param("tpl", "netdisk"))
        .and(query_param("apiver", "v3"))
        .and(header("sec-fetch-dest", "script"))
        .respond_with(jsonp(payload))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_session(server: &MockServer, body: &'static str, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/v3/login/main/qrbdusslogin"))
        .and(query_param("bduss", "CHAN123"))
        .and(query_param("callback", "bd__cbs__ay6xvs"))
        .and(header("sec-fetch-dest", "document"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_handshake() {
    let server = MockServer::start().await;
    mount_code(&server, 0, 1).await;

    Mock::given(method("GET"))
        .and(path("/channel/unicast"))
        .and(query_param("channel_id", "SIGN1"))
        .respond_with(jsonp(channel_payload(json!({ "status": 1 }))))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .named("not yet")
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/channel/unicast"))
        .and(query_param("channel_id", "SIGN1"))
        .respond_with(jsonp(channel_payload(
            json!({ "status": 0, "v": "CHAN123" }),
        )))
        .with_priority(2)
        .expect(1)
        .named("confirmed")
        .mount(&server)
        .await;
    mount_session(&server, SESSION_PAYLOAD, 1).await;

    let login = QrLogin::new(
        reqwest::Client::new(),
        RecordingStore::default(),
        test_config(&server),
    );
    let presenter = RecordingPresenter::default();
    let credential = login
        .run(&presenter, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(credential.bduss, "BDUSS_VALUE");
    assert_eq!(credential.ptoken, "PTOKEN_VALUE");
    assert_eq!(credential.stoken, "NETDISK_STOKEN");
    assert_eq!(
        credential.cookie_header,
        "BDUSS=BDUSS_VALUE;PTOKEN=PTOKEN_VALUE;STOKEN=NETDISK_STOKEN;"
    );

    let codes = presenter.codes.lock().unwrap();
    assert_eq!(codes.len(), 1);
    assert_eq!(
        codes[0].image_url,
        "https://passport.baidu.com/v2/api/qrcode?sign=SIGN1"
    );

    let calls = login.store().calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (bduss, ptoken, stoken, cookies) = &calls[0];
    assert_eq!(bduss, "BDUSS_VALUE");
    assert_eq!(ptoken, "");
    assert_eq!(stoken, "NETDISK_STOKEN");
    assert_ne!(stoken, "TOP_LEVEL_STOKEN");
    assert_eq!(cookies, &credential.cookie_header);
    drop(calls);

    let requests = server.received_requests().await.unwrap();
    let gids: Vec<String> = requests
        .iter()
        .filter(|r| r.url.path() != "/v3/login/main/qrbdusslogin")
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "gid")
                .map(|(_, v)| v.into_owned())
        })
        .collect();
    assert_eq!(gids.len(), 4);
    assert!(gids.iter().all(|g| g == &gids[0]));

    server.verify().await;
}

#[tokio::test]
async fn test_poll_survives_garbage() {
    let server = MockServer::start().await;
    mount_code(&server, 0, 1).await;

    Mock::given(method("GET"))
        .and(path("/channel/unicast"))
        .respond_with(ResponseTemplate::new(200).set_body_string("unexpected()"))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/channel/unicast"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/channel/unicast"))
        .respond_with(jsonp(channel_payload(json!({ "v": "CHAN123" }))))
        .with_priority(3)
        .expect(1)
        .mount(&server)
        .await;
    mount_session(&server, SESSION_PAYLOAD, 1).await;

    let login = QrLogin::new(
        reqwest::Client::new(),
        RecordingStore::default(),
        test_config(&server),
    );
    let credential = login
        .run(&RecordingPresenter::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(credential.stoken, "NETDISK_STOKEN");
    server.verify().await;
}

#[tokio::test]
async fn test_provider_error_aborts_before_polling() {
    let server = MockServer::start().await;
    mount_code(&server, 110_004, 1).await;

    Mock::given(method("GET"))
        .and(path("/channel/unicast"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let login = QrLogin::new(
        reqwest::Client::new(),
        RecordingStore::default(),
        test_config(&server),
    );
    let presenter = RecordingPresenter::default();
    let err = login
        .run(&presenter, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, LoginError::Provider { errno: 110_004 }));
    assert!(presenter.codes.lock().unwrap().is_empty());
    assert!(login.store().calls.lock().unwrap().is_empty());
    server.verify().await;
}

#[tokio::test]
async fn test_missing_netdisk_token_writes_nothing() {
    let server = MockServer::start().await;
    mount_code(&server, 0, 1).await;
    Mock::given(method("GET"))
        .and(path("/channel/unicast"))
        .respond_with(jsonp(channel_payload(json!({ "v": "CHAN123" }))))
        .expect(1)
        .mount(&server)
        .await;
    mount_session(
        &server,
        r#"bd__cbs__ay6xvs({'data':{'session':{'bduss':'B','ptoken':'P','stoken':'S','stokenList':'&quot;tb#TB&quot;'}}})"#,
        1,
    )
    .await;

    let login = QrLogin::new(
        reqwest::Client::new(),
        RecordingStore::default(),
        test_config(&server),
    );
    let err = login
        .run(&RecordingPresenter::default(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, LoginError::TokenNotFound));
    assert!(login.store().calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_cancel_stops_polling() {
    let server = MockServer::start().await;
    mount_code(&server, 0, 1).await;
    Mock::given(method("GET"))
        .and(path("/channel/unicast"))
        .respond_with(jsonp(channel_payload(json!({ "status": 1 }))))
        .mount(&server)
        .await;
    mount_session(&server, SESSION_PAYLOAD, 0).await;

    let login = QrLogin::new(
        reqwest::Client::new(),
        RecordingStore::default(),
        test_config(&server),
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = login
        .run(&RecordingPresenter::default(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::Cancelled));
    assert!(login.store().calls.lock().unwrap().is_empty());
    server.verify().await;
}

#[tokio::test]
async fn test_poll_deadline() {
    let server = MockServer::start().await;
    mount_code(&server, 0, 1).await;
    Mock::given(method("GET"))
        .and(path("/channel/unicast"))
        .respond_with(jsonp(channel_payload(json!({ "status": 1 }))))
        .mount(&server)
        .await;

    let config = test_config(&server).with_poll_timeout(Some(Duration::from_millis(60)));
    let login = QrLogin::new(reqwest::Client::new(), RecordingStore::default(), config);
    let err = login
        .run(&RecordingPresenter::default(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::PollTimeout(d) if d == Duration::from_millis(60)));
}

#[tokio::test]
async fn test_fetch_code_image_uses_image_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/qrcode.png"))
        .and(header("sec-fetch-dest", "image"))
        .and(header("referer", "https://pan.baidu.com/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
        .expect(1)
        .mount(&server)
        .await;

    let code = ScannableCode {
        image_url: format!("{}/qrcode.png", server.uri()),
        sign: "SIGN1".to_string(),
    };
    let login = QrLogin::new(
        reqwest::Client::new(),
        RecordingStore::default(),
        test_config(&server),
    );
    let image = login.fetch_code_image(&code).await.unwrap();
    assert_eq!(&image[..], &[0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn test_bdstoken_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("cookie", "BDUSS=B;PTOKEN=P;STOKEN=S;"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<script>var bdstoken = 'tok42';</script>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server).with_bdstoken_url(format!("{}/", server.uri()));
    let login = QrLogin::new(reqwest::Client::new(), RecordingStore::default(), config);
    let token = login.bdstoken("BDUSS=B;PTOKEN=P;STOKEN=S;").await.unwrap();
    assert_eq!(token, "tok42");
}

#[tokio::test]
async fn test_request_query_fields() {
    let server = MockServer::start().await;
    mount_code(&server, 0, 1).await;
    Mock::given(method("GET"))
        .and(path("/channel/unicast"))
        .respond_with(jsonp(channel_payload(json!({ "v": "CHAN123" }))))
        .expect(1)
        .mount(&server)
        .await;
    mount_session(&server, SESSION_PAYLOAD, 1).await;

    let login = QrLogin::new(
        reqwest::Client::new(),
        RecordingStore::default(),
        test_config(&server),
    );
    login
        .run(&RecordingPresenter::default(), &CancellationToken::new())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let find = |p: &str| {
        requests
            .iter()
            .find(|r| r.url.path() == p)
            .unwrap_or_else(|| panic!("no request to {p}"))
    };

    let code = query_of(find("/v2/api/getqrcode"));
    assert_eq!(code["lp"], "pc");
    assert_eq!(code["qrloginfrom"], "pc");
    assert_eq!(code["tpl"], "netdisk");
    assert_eq!(code["apiver"], "v3");
    let t: i64 = code["callback"]
        .strip_prefix("tangram_guid_")
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(number(&code, "tt"), t + 21232);
    assert_eq!(number(&code, "_"), number(&code, "tt") + 4);

    let poll = query_of(find("/channel/unicast"));
    assert_eq!(poll["channel_id"], "SIGN1");
    assert_eq!(poll["gid"], code["gid"]);
    let t: i64 = poll["callback"]
        .strip_prefix("tangram_guid_")
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(number(&poll, "tt"), t + 5);
    assert_eq!(number(&poll, "_"), number(&poll, "tt") + 5);

    let exchange = find("/v3/login/main/qrbdusslogin");
    let fields = query_of(exchange);
    assert_eq!(fields["loginVersion"], "v4");
    assert_eq!(fields["qrcode"], "1");
    assert_eq!(fields["alg"], "v3");
    assert_eq!(fields["traceid"], "");
    assert_eq!(fields["tpl"], "netdisk");
    assert_eq!(number(&fields, "tt"), number(&fields, "v"));
    assert_eq!(number(&fields, "time"), number(&fields, "v") + 225);
    let raw = exchange.url.query().unwrap();
    assert!(
        raw.contains("u=https%253A%252F%252Fpan.baidu.com%252Fdisk%252Fhome"),
        "redirect not double-encoded: {raw}"
    );

    server.verify().await;
}
