// Boots one relay per test binary and hands out its base URL.
use std::net::TcpListener;
use std::sync::OnceLock;

static RELAY_URL: OnceLock<String> = OnceLock::new();

// The socket is bound and listening before this returns, so the kernel queues
// early connects while the relay thread is still starting its runtime.
pub fn ensure_server() -> &'static str {
    RELAY_URL.get_or_init(|| {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral relay port");
        listener
            .set_nonblocking(true)
            .expect("relay listener must be non-blocking for tokio");
        let addr = listener.local_addr().expect("relay local addr");

        // A dedicated thread keeps the relay alive across `#[tokio::test]` runtimes.
        std::thread::Builder::new()
            .name("test-relay".to_string())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .build()
                    .expect("relay runtime");
                runtime.block_on(async move {
                    let listener =
                        tokio::net::TcpListener::from_std(listener).expect("adopt relay listener");
                    relay_server::run(listener).await.expect("relay stopped");
                });
            })
            .expect("spawn relay thread");

        format!("http://{addr}")
    })
}
