use crate::taxonomy::FurnitureTaxonomy;

/// Describe a width/height ratio in words the model can reason about.
pub fn describe_aspect_ratio(aspect_ratio: f64) -> &'static str {
    if aspect_ratio > 1.2 {
        "wider than tall"
    } else if aspect_ratio < 0.8 {
        "taller than wide"
    } else {
        "roughly square"
    }
}

/// Prompt for labelling one highlighted region of a floorplan.
pub fn furniture_prompt(taxonomy: &FurnitureTaxonomy, aspect_ratio: f64) -> String {
    format!(
        "You are analyzing a floorplan image. The object highlighted in orange with a red border \
         needs to be classified.\n\n\
         The highlighted object has an aspect ratio of {aspect_ratio:.2} ({shape}).\n\n\
         Available furniture types:\n{listing}\n\n\
         Consider:\n\
         1. The visual appearance of the object\n\
         2. Its position in the floorplan (near walls, in corners, etc.)\n\
         3. The aspect ratio compared to typical furniture\n\
         4. Context from surrounding objects and room layout\n\n\
         Respond with ONLY a JSON object in this exact format:\n\
         {{\n  \
           \"furniture_id\": \"<id from the list above>\",\n  \
           \"furniture_name\": \"<name from the list above>\",\n  \
           \"confidence\": \"high|medium|low\",\n  \
           \"reasoning\": \"<brief explanation>\"\n\
         }}",
        shape = describe_aspect_ratio(aspect_ratio),
        listing = taxonomy.prompt_listing(),
    )
}

/// Prompt for picking a catalog type for a cropped object image.
pub fn object_type_prompt(type_names: &[String]) -> String {
    format!(
        "Classify this furniture object as one of: {}. Respond with only the type name.",
        type_names.join(", ")
    )
}

pub const FLOORPLAN_GENERATION_PROMPT: &str = "Generate a clean, top-down 2D architectural floorplan \
based on the provided image. Draw walls as solid dark lines, mark doors and windows with standard \
symbols, and render each piece of furniture as a distinctly colored flat shape on a white background \
so every object is easy to tell apart. Do not add text, dimensions or shading.";

/// Prompt for revising an existing floorplan with a user's instruction.
pub fn floorplan_revision_prompt(instruction: &str) -> String {
    format!(
        "Revise the provided 2D floorplan according to this instruction: {}\n\n\
         Keep the same drawing style: top-down view, solid dark walls, standard door and window \
         symbols, and distinctly colored flat furniture shapes on a white background. \
         Change only what the instruction asks for.",
        instruction.trim()
    )
}

/// Revision asking the model to box every piece of furniture, used to locate objects.
pub const FURNITURE_MARKER_INSTRUCTION: &str = "Add black boxes over all furniture items";

pub const PHOTOREALISTIC_PROMPT: &str = "Generate a photorealistic top-down interior image from \
the provided floorplan or sketch. Keep every wall, door, window and piece of furniture where it is, \
and render realistic materials, lighting and soft shadows.";

/// Prompt for revising a photorealistic render.
pub fn render_revision_prompt(instruction: &str) -> String {
    format!(
        "Revise the provided photorealistic top-down interior image according to this \
         instruction: {}\n\nKeep the layout and viewpoint unchanged.",
        instruction.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_aspect_ratio() {
        assert_eq!(describe_aspect_ratio(2.0), "wider than tall");
        assert_eq!(describe_aspect_ratio(0.5), "taller than wide");
        assert_eq!(describe_aspect_ratio(1.0), "roughly square");
        assert_eq!(describe_aspect_ratio(1.2), "roughly square");
        assert_eq!(describe_aspect_ratio(0.8), "roughly square");
    }

    #[test]
    fn test_furniture_prompt_mentions_shape_and_types() {
        let prompt = furniture_prompt(&FurnitureTaxonomy::default(), 2.5);
        assert!(prompt.contains("aspect ratio of 2.50 (wider than tall)"));
        assert!(prompt.contains("- kitchen_counter: Kitchen Counter"));
        assert!(prompt.contains("\"furniture_id\""));
    }

    #[test]
    fn test_object_type_prompt_lists_names() {
        let prompt = object_type_prompt(&["table".to_string(), "chair".to_string()]);
        assert!(prompt.contains("table, chair"));
    }

    #[test]
    fn test_render_revision_prompt_trims_instruction() {
        let prompt = render_revision_prompt("  warmer lighting \n");
        assert!(prompt.contains("instruction: warmer lighting\n"));
        assert!(prompt.contains("layout and viewpoint unchanged"));
    }

    #[test]
    fn test_marker_instruction_fits_revision_prompt() {
        let prompt = floorplan_revision_prompt(FURNITURE_MARKER_INSTRUCTION);
        assert!(prompt.contains("instruction: Add black boxes over all furniture items"));
    }
}
