// Example: Extract colored furniture regions from a rendered floorplan and label them with GPT-4o
use std::fs;

use region_extractor::{extract_regions_with_observer, ExtractionConfig, TracingObserver};
use vision_classifier::{ClassifyOptions, FurnitureTaxonomy, VisionClassifier};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("🔍 Floorplan Furniture Classifier");
    println!("=================================\n");

    if std::env::var("OPENAI_API_KEY").is_err() {
        eprintln!("❌ Error: OPENAI_API_KEY environment variable not set");
        eprintln!("\nPlease set your OpenAI API key:");
        eprintln!("  export OPENAI_API_KEY=sk-...");
        return Ok(());
    }

    let args: Vec<String> = std::env::args().collect();
    let Some(image_path) = args.get(1) else {
        eprintln!("Usage: cargo run --example classify_furniture IMAGE_PATH [VOTES]");
        return Ok(());
    };
    let votes = args.get(2).and_then(|v| v.parse().ok()).unwrap_or(1);

    println!("📂 Loading image: {}", image_path);
    let image = image::open(image_path)?.to_rgb8();

    let detections = extract_regions_with_observer(
        &image,
        None,
        &ExtractionConfig::default(),
        &mut TracingObserver,
    )?;
    println!("✅ Found {} regions\n", detections.len());

    let classifier = VisionClassifier::from_env()?;
    let taxonomy = FurnitureTaxonomy::default();
    let options = ClassifyOptions {
        votes,
        ..Default::default()
    };

    println!("🤖 Classifying with {}...\n", classifier.model());
    let objects = classifier
        .classify_regions(&image, &detections.to_records(), &taxonomy, options)
        .await?;

    println!("📊 Results:");
    println!("{}", "=".repeat(70));
    for object in &objects {
        println!(
            "\n🪑 {}: {} ({:?})",
            object.id, object.name, object.confidence
        );
        println!(
            "   Center: ({:.3}, {:.3})  Size: {:.3} x {:.3}",
            object.position.x, object.position.y, object.dimensions.width, object.dimensions.height
        );
        println!(
            "   Aspect ratio: {} ({})",
            object.aspect_ratio.value, object.aspect_ratio.description
        );
        println!("   Reasoning: {}", object.reasoning);
    }
    println!("\n{}", "=".repeat(70));

    let output_path = "furniture_classification.json";
    fs::write(output_path, serde_json::to_string_pretty(&objects)?)?;
    println!("💾 Saved results to: {}", output_path);

    Ok(())
}
