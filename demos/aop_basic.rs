//! 基础示例：从配置初始化全局 AspectManager，并用 `#[advised]` 织入方法
//!
//! ```bash
//! cargo run --example aop_basic
//! ```

use anyhow::{anyhow, Result};
use aspectx::aop::{self, Scope, TracingConfig};
use aspectx::advised;
use aspectx::log::add_mdc_value;

struct OrderRepository;

impl OrderRepository {
    #[advised]
    async fn save(&self, scope: &Scope, order_id: u64) -> Result<()> {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        if order_id % 2 == 0 {
            return Err(anyhow!("duplicate order {}", order_id));
        }
        Ok(())
    }
}

struct OrderService {
    repository: OrderRepository,
}

impl OrderService {
    #[advised]
    async fn place(&self, scope: &Scope, order_id: u64) -> Result<u64> {
        self.repository.save(scope, order_id).await?;
        Ok(order_id)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    aop::init_tracing(&TracingConfig::default())?;

    aop::init_with_config(json5::from_str(
        r#"{
            service_name: "order-service",
            join_points: [
                { pointcut: ".*", advice: { type: "SpanAdvice" } },
                { pointcut: "OrderRepository", advice: { type: "TimedAdvice", options: { name: "repository_duration_seconds" } } },
                {
                    pointcut: "OrderService",
                    advice: {
                        type: "LoggingAdvice",
                        options: {
                            level: "info",
                            logger: {
                                level: "info",
                                formatter: { type: "TextFormatter", options: { colored: true } },
                                appender: { type: "ConsoleAppender" },
                            },
                        },
                    },
                },
            ],
        }"#,
    )?)?;

    let service = OrderService {
        repository: OrderRepository,
    };

    for order_id in 1..=4 {
        let scope = add_mdc_value(Scope::new(), "request_id", format!("req-{}", order_id));
        match service.place(&scope, order_id).await {
            Ok(id) => println!("order {} placed", id),
            Err(e) => println!("order {} failed: {}", order_id, e),
        }
    }

    println!("\n{}", aop::encode_global_registry()?);
    Ok(())
}
